//! Single source of truth for attached widgets

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{
    DynamicWidget, FixedWidget, FoldingSummaryWidget, HandleState, ViewZoneHost, WidgetId,
    WidgetKindTag, ZonePlacement,
};

/// A live widget of any variant
#[derive(Debug)]
pub enum WidgetHandle {
    Fixed(FixedWidget),
    Dynamic(DynamicWidget),
    Summary(FoldingSummaryWidget),
}

impl WidgetHandle {
    pub fn id(&self) -> &WidgetId {
        match self {
            WidgetHandle::Fixed(w) => w.id(),
            WidgetHandle::Dynamic(w) => w.id(),
            WidgetHandle::Summary(w) => w.id(),
        }
    }

    pub fn kind_tag(&self) -> WidgetKindTag {
        match self {
            WidgetHandle::Fixed(w) => w.kind().tag(),
            WidgetHandle::Dynamic(w) => w.kind().tag(),
            WidgetHandle::Summary(_) => WidgetKindTag::FoldingSummary,
        }
    }

    pub fn state(&self) -> HandleState {
        match self {
            WidgetHandle::Fixed(w) => w.state(),
            WidgetHandle::Dynamic(w) => w.state(),
            WidgetHandle::Summary(w) => w.state(),
        }
    }

    pub fn render_target(&self) -> Option<Entity> {
        match self {
            WidgetHandle::Fixed(w) => w.render_target(),
            WidgetHandle::Dynamic(w) => w.render_target(),
            WidgetHandle::Summary(w) => w.render_target(),
        }
    }

    pub fn placement(&self) -> &ZonePlacement {
        match self {
            WidgetHandle::Fixed(w) => w.placement(),
            WidgetHandle::Dynamic(w) => w.placement(),
            WidgetHandle::Summary(w) => w.placement(),
        }
    }

    pub fn current_height(&self) -> f32 {
        self.placement().height
    }

    pub fn anchor_line(&self) -> usize {
        self.placement().line
    }

    pub fn dispose(&mut self, host: &mut dyn ViewZoneHost) {
        match self {
            WidgetHandle::Fixed(w) => w.dispose(host),
            WidgetHandle::Dynamic(w) => w.dispose(host),
            WidgetHandle::Summary(w) => w.dispose(host),
        }
    }
}

/// Widget id → live handle; at most one handle per id
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    handles: BTreeMap<WidgetId, WidgetHandle>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn get(&self, id: &WidgetId) -> Option<&WidgetHandle> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &WidgetId) -> Option<&mut WidgetHandle> {
        self.handles.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &WidgetId> {
        self.handles.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WidgetId, &WidgetHandle)> {
        self.handles.iter()
    }

    /// Add a handle; an existing handle under the same id is disposed first
    pub fn insert(&mut self, handle: WidgetHandle, host: &mut dyn ViewZoneHost) {
        if let Some(mut previous) = self.handles.insert(handle.id().clone(), handle) {
            warn!("widget {} replaced while still attached", previous.id());
            previous.dispose(host);
        }
    }

    /// Dispose and forget a handle; false when the id was not registered
    pub fn dispose(&mut self, id: &WidgetId, host: &mut dyn ViewZoneHost) -> bool {
        match self.handles.remove(id) {
            Some(mut handle) => {
                handle.dispose(host);
                true
            }
            None => false,
        }
    }

    /// Dispose everything (engine teardown or not-ready guard)
    pub fn dispose_all(&mut self, host: &mut dyn ViewZoneHost) -> usize {
        let count = self.handles.len();
        for (_, mut handle) in std::mem::take(&mut self.handles) {
            handle.dispose(host);
        }
        count
    }

    /// Render targets keyed by widget id
    pub fn render_targets(&self) -> BTreeMap<WidgetId, Entity> {
        self.handles
            .iter()
            .filter_map(|(id, handle)| handle.render_target().map(|target| (id.clone(), target)))
            .collect()
    }

    /// Route a content measurement to a dynamic widget
    pub fn observe_size(&mut self, target: Entity, measured: f32, now: Duration) -> bool {
        for handle in self.handles.values_mut() {
            if let WidgetHandle::Dynamic(widget) = handle {
                if widget.render_target() == Some(target) {
                    widget.observe(measured, now);
                    return true;
                }
            }
        }
        false
    }

    /// Apply settled measurements; returns the ids that were resized
    pub fn poll_sizes(&mut self, host: &mut dyn ViewZoneHost, now: Duration) -> Vec<WidgetId> {
        let mut resized = Vec::new();
        for (id, handle) in self.handles.iter_mut() {
            if let WidgetHandle::Dynamic(widget) = handle {
                if widget.poll(host, now) {
                    resized.push(id.clone());
                }
            }
        }
        resized
    }

    /// Entities of dynamic widgets (the ones that need measuring)
    pub fn dynamic_targets(&self) -> impl Iterator<Item = Entity> + '_ {
        self.handles.values().filter_map(|handle| match handle {
            WidgetHandle::Dynamic(widget) => widget.render_target(),
            _ => None,
        })
    }

    pub fn summary(&self, id: &WidgetId) -> Option<&FoldingSummaryWidget> {
        match self.handles.get(id)? {
            WidgetHandle::Summary(widget) => Some(widget),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::test_host::{HostCall, RecordingHost};
    use crate::widgets::{WatcherConfig, WidgetKind};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn fixed(id: &str, line: usize) -> WidgetHandle {
        WidgetHandle::Fixed(FixedWidget::new(
            WidgetId::new(id),
            WidgetKind::OutputViewer { block_id: id.into() },
            ZonePlacement::below(line, 30.0, 100.0),
        ))
    }

    #[test]
    fn test_dispose_removes_id_once() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let mut handle = fixed("a", 1);
        if let WidgetHandle::Fixed(w) = &mut handle {
            w.attach(&mut host);
        }
        registry.insert(handle, &mut host);

        let id = WidgetId::new("a");
        assert!(registry.dispose(&id, &mut host));
        assert!(!registry.contains(&id));
        assert!(!registry.dispose(&id, &mut host));
        assert_eq!(host.count(|c| matches!(c, HostCall::DestroyTarget(..))), 1);
    }

    #[test]
    fn test_insert_same_id_keeps_one_handle() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        for line in [1, 2] {
            let mut handle = fixed("a", line);
            if let WidgetHandle::Fixed(w) = &mut handle {
                w.attach(&mut host);
            }
            registry.insert(handle, &mut host);
        }

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&WidgetId::new("a")).unwrap().anchor_line(), 2);
        assert_eq!(host.targets.len(), 1);
    }

    #[test]
    fn test_size_routing() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let config = WatcherConfig {
            min_height: 40.0,
            max_height: 200.0,
            grace: ms(0),
            debounce: ms(10),
            change_threshold_px: 1.0,
            epsilon_px: 1.0,
        };
        let mut widget = DynamicWidget::new(
            WidgetId::output("x"),
            WidgetKind::OutputViewer { block_id: "x".into() },
            4,
            300.0,
            config,
        );
        widget.attach(&mut host, ms(0));
        let target = widget.render_target().unwrap();
        registry.insert(WidgetHandle::Dynamic(widget), &mut host);

        assert_eq!(registry.dynamic_targets().collect::<Vec<_>>(), vec![target]);
        assert!(registry.observe_size(target, 90.0, ms(5)));
        assert_eq!(registry.poll_sizes(&mut host, ms(20)), vec![WidgetId::output("x")]);
        assert_eq!(registry.get(&WidgetId::output("x")).unwrap().current_height(), 90.0);

        assert_eq!(registry.dispose_all(&mut host), 1);
        assert!(registry.is_empty());
        assert!(host.targets.is_empty());
    }
}
