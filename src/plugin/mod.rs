//! Bevy plugin wiring the widget engine into an app
//!
//! Systems run in `Update`, chained: lifecycle messages, document sync,
//! folding detection and commands, trigger collection, the reconciliation
//! pass, gutter glyphs, size measurement and finally layout.

mod folding;
mod gutter;
mod layout;
mod sizing;
mod surface;

pub(crate) use folding::*;
pub(crate) use gutter::*;
pub(crate) use layout::*;
pub(crate) use sizing::*;

pub use folding::OpenForms;
pub use gutter::{GutterGlyph, GutterGlyphs};
pub use layout::NotebookLayoutMap;
pub use surface::*;

use bevy::prelude::*;

use crate::document::NotebookDocument;
use crate::engine::{Trigger, WidgetEngine};
use crate::events::*;
use crate::folding::FoldingProviders;
use crate::reconcile::ReconcileInput;
use crate::settings::{SettingsBundle, SizingObserverSettings, WidgetSizingSettings};
use crate::types::{BlockResults, EditorLayout, FoldState, NotebookBuffer};

/// Embedded widget plugin for notebook documents
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_notebook_widgets::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(NotebookWidgetsPlugin::default())
///     .insert_resource(NotebookBuffer::new("```sql id=q1\nselect 1\n```\n"))
///     .run();
/// ```
#[derive(Clone)]
pub struct NotebookWidgetsPlugin {
    settings: SettingsBundle,
    open_on_startup: bool,
    sync_document: bool,
}

impl Default for NotebookWidgetsPlugin {
    fn default() -> Self {
        Self {
            settings: SettingsBundle::default(),
            open_on_startup: true,
            sync_document: true,
        }
    }
}

impl NotebookWidgetsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom settings
    pub fn with_settings(mut self, settings: SettingsBundle) -> Self {
        self.settings = settings;
        self
    }

    /// Open the engine at startup instead of waiting for [`NotebookOpened`]
    pub fn open_on_startup(mut self, open: bool) -> Self {
        self.open_on_startup = open;
        self
    }

    /// Rebuild [`NotebookDocument`] from the buffer on every edit
    ///
    /// Disable when an external parser maintains the document model.
    pub fn sync_document(mut self, sync: bool) -> Self {
        self.sync_document = sync;
        self
    }
}

/// Present while the document model follows the buffer
#[derive(Resource, Default)]
struct SyncDocumentFromText;

impl Plugin for NotebookWidgetsPlugin {
    fn build(&self, app: &mut App) {
        self.settings.clone().insert_into(app);
        app.insert_resource(WidgetEngine::new(&self.settings.triggers));

        app.init_resource::<EditorLayout>();
        app.init_resource::<FoldState>();
        app.init_resource::<BlockResults>();
        app.init_resource::<FoldingProviders>();
        app.init_resource::<ViewZones>();
        app.init_resource::<RenderTargets>();
        app.init_resource::<OpenForms>();
        app.init_resource::<GutterGlyphs>();
        app.init_resource::<NotebookLayoutMap>();
        if self.sync_document {
            app.init_resource::<NotebookDocument>();
            app.init_resource::<SyncDocumentFromText>();
        }

        app.add_message::<TextEditEvent>();
        app.add_message::<CollapseAllRequested>();
        app.add_message::<ExpandAllRequested>();
        app.add_message::<FocusBlockRequested>();
        app.add_message::<GutterClicked>();
        app.add_message::<SummaryActionRequested>();
        app.add_message::<NotebookOpened>();
        app.add_message::<NotebookClosed>();
        app.add_message::<RunRequested>();
        app.add_message::<RevealLineRequested>();
        app.add_message::<FormSurfaceChanged>();
        app.add_message::<RenderTargetsChanged>();

        if self.open_on_startup {
            app.add_systems(Startup, open_engine);
        }

        app.add_systems(
            Update,
            (
                handle_lifecycle,
                sync_document.run_if(resource_exists::<SyncDocumentFromText>),
                detect_folding_regions,
                handle_fold_commands,
                handle_summary_actions,
                collect_triggers,
            )
                .chain(),
        );
        app.add_systems(
            Update,
            (
                run_reconcile_pass,
                refresh_gutter_glyphs,
                spawn_gutter_glyphs,
                measure_widget_sizes,
                layout_view_zones,
                emit_gutter_clicks,
                handle_gutter_clicks,
            )
                .chain()
                .after(collect_triggers),
        );
    }
}

fn open_engine(
    time: Res<Time>,
    mut engine: ResMut<WidgetEngine>,
    mut providers: ResMut<FoldingProviders>,
) {
    engine.open(&mut providers, time.elapsed());
}

/// Open and close the engine; a close and reopen in one frame tears down first
fn handle_lifecycle(
    mut commands: Commands,
    time: Res<Time>,
    mut opened: MessageReader<NotebookOpened>,
    mut closed: MessageReader<NotebookClosed>,
    mut engine: ResMut<WidgetEngine>,
    mut providers: ResMut<FoldingProviders>,
    mut zones: ResMut<ViewZones>,
    mut glyphs: ResMut<GutterGlyphs>,
    mut render_targets: ResMut<RenderTargets>,
    mut targets_changed: MessageWriter<RenderTargetsChanged>,
) {
    if closed.read().count() > 0 {
        let mut surface = BevySurface::new(&mut commands, &mut zones);
        engine.teardown(&mut surface, &mut *glyphs, &mut providers);

        if !render_targets.is_empty() {
            render_targets.targets.clear();
            targets_changed.write(RenderTargetsChanged {
                targets: Default::default(),
            });
        }
    }

    if opened.read().count() > 0 {
        engine.open(&mut providers, time.elapsed());
    }
}

/// Keep the document model in step with the text
fn sync_document(buffer: Option<Res<NotebookBuffer>>, mut document: ResMut<NotebookDocument>) {
    let Some(buffer) = buffer else {
        return;
    };
    if !buffer.is_changed() {
        return;
    }
    let scanned = NotebookDocument::scan(document.name.clone(), &buffer.rope);
    document.set_if_neq(scanned);
}

/// Turn resource changes and edit messages into debounced triggers
fn collect_triggers(
    time: Res<Time>,
    mut engine: ResMut<WidgetEngine>,
    mut edits: MessageReader<TextEditEvent>,
    buffer: Option<Res<NotebookBuffer>>,
    document: Option<Res<NotebookDocument>>,
    fold_state: Res<FoldState>,
    layout: Res<EditorLayout>,
    results: Res<BlockResults>,
    mut present: Local<(bool, bool)>,
    mut measured: Local<Option<(bool, f32)>>,
) {
    if !engine.is_open() {
        edits.clear();
        return;
    }
    let now = time.elapsed();

    // Text or document appearing or disappearing counts as a text change
    let availability = (buffer.is_some(), document.is_some());
    let mut text_changed = availability != *present;
    *present = availability;
    text_changed |= edits.read().count() > 0;
    text_changed |= buffer.as_ref().is_some_and(|b| b.is_changed());
    text_changed |= document.as_ref().is_some_and(|d| d.is_changed());

    if text_changed {
        engine.notify(Trigger::Text, now);
    }
    if fold_state.is_changed() {
        engine.notify(Trigger::Folding, now);
    }
    // Scrolling only moves targets, which the layout system already does
    let geometry = (layout.is_ready(), layout.available_width());
    if layout.is_changed() && *measured != Some(geometry) {
        *measured = Some(geometry);
        engine.notify(Trigger::Layout, now);
    }
    if results.is_changed() {
        engine.notify(Trigger::Results, now);
    }
}

/// Run a pass when a debouncer or the folding retry fires
fn run_reconcile_pass(
    mut commands: Commands,
    time: Res<Time>,
    mut engine: ResMut<WidgetEngine>,
    mut zones: ResMut<ViewZones>,
    mut render_targets: ResMut<RenderTargets>,
    mut targets_changed: MessageWriter<RenderTargetsChanged>,
    buffer: Option<Res<NotebookBuffer>>,
    document: Option<Res<NotebookDocument>>,
    layout: Res<EditorLayout>,
    fold_state: Res<FoldState>,
    results: Res<BlockResults>,
    widgets: Res<WidgetSizingSettings>,
    observer: Res<SizingObserverSettings>,
) {
    let now = time.elapsed();
    let Some(origin) = engine.due(now) else {
        return;
    };

    let input = ReconcileInput {
        text: buffer.as_deref().map(|b| &b.rope),
        document: document.as_deref(),
        layout: &*layout,
        folding: &*fold_state,
        results: &*results,
        widgets: &*widgets,
        observer: &*observer,
    };
    let mut surface = BevySurface::new(&mut commands, &mut zones);
    let report = engine.run_pass(origin, &input, &mut surface, now);

    if report.published_changed {
        render_targets.targets = engine.reconciler().published().clone();
        targets_changed.write(RenderTargetsChanged {
            targets: render_targets.targets.clone(),
        });
    }
}
