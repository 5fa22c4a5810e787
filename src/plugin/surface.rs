//! Render targets and view zones on the Bevy side

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::widgets::{
    SizingPolicy, SummaryContent, ViewZoneHost, WidgetId, WidgetKind, WidgetKindTag, ZoneId,
    ZonePlacement,
};

/// Marker on every render-target node
#[derive(Component, Clone, Debug)]
pub struct WidgetRenderTarget {
    pub widget: WidgetId,
    pub kind: WidgetKindTag,
}

/// Data for a parameter form node
#[derive(Component, Clone, Debug, PartialEq)]
pub struct ParameterFormTarget {
    pub form_id: String,
    pub param_names: Vec<String>,
}

/// Data for an output viewer node
#[derive(Component, Clone, Debug, PartialEq)]
pub struct OutputViewerTarget {
    pub block_id: String,
}

/// Data for a folding summary node
#[derive(Component, Clone, Debug, PartialEq)]
pub struct FoldingSummaryTarget {
    pub content: SummaryContent,
}

/// One reserved zone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewZone {
    pub target: Entity,
    pub placement: ZonePlacement,
    pub sizing: SizingPolicy,
}

/// Zones currently reserved in the editor, read by the layout system
#[derive(Resource, Debug, Default)]
pub struct ViewZones {
    next_id: u64,
    zones: BTreeMap<ZoneId, ViewZone>,
}

impl ViewZones {
    pub fn get(&self, zone: ZoneId) -> Option<&ViewZone> {
        self.zones.get(&zone)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &ViewZone)> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    fn insert(&mut self, zone: ViewZone) -> ZoneId {
        let id = ZoneId(self.next_id);
        self.next_id += 1;
        self.zones.insert(id, zone);
        id
    }
}

/// Published widget id → render target map
///
/// UI layers look their targets up here (or listen for
/// [`RenderTargetsChanged`](crate::events::RenderTargetsChanged)) and fill
/// the nodes with their own content.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct RenderTargets {
    pub targets: BTreeMap<WidgetId, Entity>,
}

impl RenderTargets {
    pub fn get(&self, id: &WidgetId) -> Option<Entity> {
        self.targets.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WidgetId, &Entity)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// [`ViewZoneHost`] backed by `Commands` and the [`ViewZones`] resource
pub struct BevySurface<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub zones: &'a mut ViewZones,
}

impl<'a, 'w, 's> BevySurface<'a, 'w, 's> {
    pub fn new(commands: &'a mut Commands<'w, 's>, zones: &'a mut ViewZones) -> Self {
        Self { commands, zones }
    }
}

fn insert_kind_data(entity: &mut EntityCommands, kind: &WidgetKind) {
    match kind {
        WidgetKind::ParameterForm {
            form_id,
            param_names,
        } => {
            entity.insert(ParameterFormTarget {
                form_id: form_id.clone(),
                param_names: param_names.clone(),
            });
        }
        WidgetKind::OutputViewer { block_id } => {
            entity.insert(OutputViewerTarget {
                block_id: block_id.clone(),
            });
        }
        WidgetKind::FoldingSummary(content) => {
            entity.insert(FoldingSummaryTarget {
                content: content.clone(),
            });
        }
    }
}

impl ViewZoneHost for BevySurface<'_, '_, '_> {
    fn create_render_target(&mut self, widget: &WidgetId, kind: &WidgetKind) -> Entity {
        let mut entity = self.commands.spawn((
            Node {
                position_type: PositionType::Absolute,
                overflow: Overflow::clip(),
                ..default()
            },
            // Shown once the layout system has placed it
            Visibility::Hidden,
            WidgetRenderTarget {
                widget: widget.clone(),
                kind: kind.tag(),
            },
            Name::new(format!("WidgetTarget_{widget}")),
        ));
        insert_kind_data(&mut entity, kind);
        entity.id()
    }

    fn update_render_target(&mut self, target: Entity, kind: &WidgetKind) {
        if let Ok(mut entity) = self.commands.get_entity(target) {
            insert_kind_data(&mut entity, kind);
        } else {
            warn!("render target {target} is gone, cannot update it");
        }
    }

    fn destroy_render_target(&mut self, target: Entity) {
        if let Ok(mut entity) = self.commands.get_entity(target) {
            entity.despawn();
        }
    }

    fn add_zone(&mut self, target: Entity, placement: ZonePlacement, sizing: SizingPolicy) -> ZoneId {
        self.zones.insert(ViewZone {
            target,
            placement,
            sizing,
        })
    }

    fn layout_zone(&mut self, zone: ZoneId, placement: ZonePlacement) {
        match self.zones.zones.get_mut(&zone) {
            Some(entry) => entry.placement = placement,
            None => warn!("layout of unknown zone {zone:?}"),
        }
    }

    fn remove_zone(&mut self, zone: ZoneId) {
        self.zones.zones.remove(&zone);
    }
}
