//! Gutter glyph entities

use bevy::prelude::*;

use crate::document::DocumentOutline;
use crate::engine::WidgetEngine;
use crate::events::{GutterClicked, RunRequested, RunTarget};
use crate::gutter::{DecorationHost, GutterDecoration, GutterGlyphKind, RunRequestSink};
use crate::settings::GutterSettings;
use crate::types::{BlockResults, NotebookBuffer};

/// Marker for a run-status glyph
#[derive(Component, Clone, Debug)]
pub struct GutterGlyph {
    pub line: usize,
    pub kind: GutterGlyphKind,
}

/// Current decoration set and the glyph entities drawing it
///
/// The engine replaces `decorations`; a later system turns them into entities.
#[derive(Resource, Debug, Default)]
pub struct GutterGlyphs {
    pub decorations: Vec<GutterDecoration>,
    entities: Vec<Entity>,
}

impl GutterGlyphs {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

impl DecorationHost for GutterGlyphs {
    fn replace_decorations(&mut self, decorations: &[GutterDecoration]) {
        self.decorations = decorations.to_vec();
    }
}

/// Collects run requests so they can be written as messages afterwards
#[derive(Default)]
pub(crate) struct RunRequests(pub Vec<RunRequested>);

impl RunRequestSink for RunRequests {
    fn run_block(&mut self, block_id: &str) {
        self.0.push(RunRequested {
            target: RunTarget::Block(block_id.to_string()),
        });
    }

    fn run_all_blocks(&mut self) {
        self.0.push(RunRequested {
            target: RunTarget::All,
        });
    }
}

/// Rebuild the decoration set after every reconciliation pass
pub(crate) fn refresh_gutter_glyphs(
    mut engine: ResMut<WidgetEngine>,
    mut glyphs: ResMut<GutterGlyphs>,
    buffer: Option<Res<NotebookBuffer>>,
    results: Res<BlockResults>,
    mut last_pass: Local<u64>,
) {
    if engine.passes() == *last_pass || !engine.is_open() {
        return;
    }
    *last_pass = engine.passes();
    let Some(buffer) = buffer else {
        return;
    };

    let outline = DocumentOutline::scan(&buffer.rope);
    if engine.refresh_gutter(&outline, &results, glyphs.bypass_change_detection()) {
        glyphs.set_changed();
    }
}

/// Respawn the glyph entities whenever the decoration set changes
pub(crate) fn spawn_gutter_glyphs(
    mut commands: Commands,
    mut glyphs: ResMut<GutterGlyphs>,
    settings: Res<GutterSettings>,
) {
    if !glyphs.is_changed() && !settings.is_changed() {
        return;
    }
    // Entity bookkeeping is not a decoration change
    let glyphs = glyphs.bypass_change_detection();

    for entity in glyphs.entities.drain(..) {
        if let Ok(mut entity) = commands.get_entity(entity) {
            entity.despawn();
        }
    }
    if !settings.enabled {
        return;
    }

    for decoration in &glyphs.decorations {
        let kind = decoration.glyph();
        let entity = commands
            .spawn((
                Text::new(settings.glyph(kind)),
                TextFont {
                    font_size: settings.font_size,
                    ..default()
                },
                TextColor(settings.color(kind)),
                Node {
                    position_type: PositionType::Absolute,
                    ..default()
                },
                Interaction::default(),
                Visibility::Hidden,
                GutterGlyph {
                    line: decoration.line,
                    kind,
                },
                Name::new(format!("GutterGlyph_{}", decoration.line)),
            ))
            .id();
        glyphs.entities.push(entity);
    }
}

/// Turn presses on glyph nodes into [`GutterClicked`]
pub(crate) fn emit_gutter_clicks(
    glyphs: Query<(&Interaction, &GutterGlyph), Changed<Interaction>>,
    mut clicks: MessageWriter<GutterClicked>,
) {
    for (interaction, glyph) in glyphs.iter() {
        if *interaction == Interaction::Pressed {
            clicks.write(GutterClicked { line: glyph.line });
        }
    }
}

/// Dispatch gutter clicks to run requests
pub(crate) fn handle_gutter_clicks(
    engine: Res<WidgetEngine>,
    mut clicks: MessageReader<GutterClicked>,
    mut runs: MessageWriter<RunRequested>,
) {
    let mut requests = RunRequests::default();
    for click in clicks.read() {
        engine.click_gutter(click.line, &mut requests);
    }
    for request in requests.0 {
        runs.write(request);
    }
}
