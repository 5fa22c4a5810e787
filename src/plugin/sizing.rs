//! Feeding measured node heights to dynamic widgets

use bevy::prelude::*;

use super::{BevySurface, ViewZones, WidgetRenderTarget};
use crate::engine::WidgetEngine;

/// Route layout measurements to the size watchers and apply settled heights
pub(crate) fn measure_widget_sizes(
    mut commands: Commands,
    time: Res<Time>,
    mut engine: ResMut<WidgetEngine>,
    mut zones: ResMut<ViewZones>,
    measured: Query<(Entity, &ComputedNode), (With<WidgetRenderTarget>, Changed<ComputedNode>)>,
) {
    let now = time.elapsed();
    let registry = engine.reconciler_mut().registry_mut();
    if registry.is_empty() {
        return;
    }

    for (entity, node) in measured.iter() {
        let height = node.size().y * node.inverse_scale_factor();
        registry.observe_size(entity, height, now);
    }

    // Only flag the zones as changed when something was actually resized
    let mut surface = BevySurface::new(&mut commands, zones.bypass_change_detection());
    let resized = registry.poll_sizes(&mut surface, now);
    if !resized.is_empty() {
        debug!("resized {} widgets", resized.len());
        zones.set_changed();
    }
}
