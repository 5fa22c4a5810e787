//! Positioning of render targets and gutter glyphs

use bevy::prelude::*;

use super::{GutterGlyph, GutterGlyphs, ViewZones, WidgetRenderTarget};
use crate::display_map::{FoldMap, ZoneMap};
use crate::settings::GutterSettings;
use crate::types::{EditorLayout, FoldState, NotebookBuffer};
use crate::widgets::SizingPolicy;

/// Line and zone geometry of the last layout, for hosts that draw the text
#[derive(Resource, Debug, Default, Clone)]
pub struct NotebookLayoutMap {
    pub zones: ZoneMap,
}

impl NotebookLayoutMap {
    /// Screen-space top of a buffer line, scroll offset and margin applied
    pub fn line_y(&self, line: usize, layout: &EditorLayout) -> f32 {
        layout.margin_top + layout.scroll_offset + self.zones.line_top(line)
    }
}

/// Place every zone's render target and every glyph
///
/// Targets anchored on folded-away lines are hidden, not destroyed.
pub(crate) fn layout_view_zones(
    zones: Res<ViewZones>,
    fold_state: Res<FoldState>,
    layout: Res<EditorLayout>,
    buffer: Option<Res<NotebookBuffer>>,
    glyph_set: Res<GutterGlyphs>,
    gutter_settings: Res<GutterSettings>,
    mut layout_map: ResMut<NotebookLayoutMap>,
    mut targets: Query<(&mut Node, &mut Visibility), (With<WidgetRenderTarget>, Without<GutterGlyph>)>,
    mut glyphs: Query<(&GutterGlyph, &mut Node, &mut Visibility), Without<WidgetRenderTarget>>,
) {
    let buffer_changed = buffer.as_ref().is_some_and(|b| b.is_changed());
    if !(zones.is_changed()
        || fold_state.is_changed()
        || layout.is_changed()
        || glyph_set.is_changed()
        || buffer_changed)
    {
        return;
    }

    let line_count = buffer.as_ref().map(|b| b.line_count()).unwrap_or(0);
    let mut fold_map = FoldMap::new();
    fold_map.update(line_count, &fold_state.regions);
    let zone_map = ZoneMap::new(
        fold_map,
        zones.iter().map(|(_, zone)| zone.placement),
        layout.line_height,
    );

    let origin = layout.margin_top + layout.scroll_offset;
    for (_, zone) in zones.iter() {
        let Ok((mut node, mut visibility)) = targets.get_mut(zone.target) else {
            continue;
        };
        let Some(top) = zone_map.zone_top(&zone.placement) else {
            *visibility = Visibility::Hidden;
            continue;
        };

        node.position_type = PositionType::Absolute;
        node.left = Val::Px(layout.gutter_width);
        node.top = Val::Px(origin + top);
        node.width = Val::Px(zone.placement.width);
        match zone.sizing {
            SizingPolicy::Fixed { .. } => {
                node.height = Val::Px(zone.placement.height);
            }
            SizingPolicy::Dynamic { min, max } => {
                // Content decides; the size watcher feeds the result back into the zone
                node.height = Val::Auto;
                node.min_height = Val::Px(min);
                node.max_height = Val::Px(max);
            }
        }
        *visibility = Visibility::Visible;
    }

    for (glyph, mut node, mut visibility) in glyphs.iter_mut() {
        if zone_map.fold_map().is_line_hidden(glyph.line) {
            *visibility = Visibility::Hidden;
            continue;
        }
        node.left = Val::Px(gutter_settings.offset_x);
        node.top = Val::Px(origin + zone_map.line_top(glyph.line));
        *visibility = Visibility::Visible;
    }

    layout_map.zones = zone_map;
}
