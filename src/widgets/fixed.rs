//! Fixed-size widget handle

use bevy::prelude::*;

use super::{HandleState, SizingPolicy, ViewZoneHost, WidgetId, WidgetKind, ZonePlacement};

/// Widget whose height is known before it renders
#[derive(Debug)]
pub struct FixedWidget {
    id: WidgetId,
    kind: WidgetKind,
    state: HandleState,
    target: Option<Entity>,
    placement: ZonePlacement,
}

impl FixedWidget {
    pub fn new(id: WidgetId, kind: WidgetKind, placement: ZonePlacement) -> Self {
        Self {
            id,
            kind,
            state: HandleState::Unattached,
            target: None,
            placement,
        }
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, HandleState::Attached(_))
    }

    pub fn is_disposed(&self) -> bool {
        self.state == HandleState::Disposed
    }

    pub fn render_target(&self) -> Option<Entity> {
        self.target
    }

    pub fn placement(&self) -> &ZonePlacement {
        &self.placement
    }

    pub fn current_height(&self) -> f32 {
        self.placement.height
    }

    /// Create the render target and reserve exactly `placement.height`
    pub fn attach(&mut self, host: &mut dyn ViewZoneHost) {
        self.attach_with(host, SizingPolicy::Fixed {
            height: self.placement.height,
        });
    }

    pub(crate) fn attach_with(&mut self, host: &mut dyn ViewZoneHost, sizing: SizingPolicy) {
        if self.state != HandleState::Unattached {
            return;
        }
        let target = host.create_render_target(&self.id, &self.kind);
        let zone = host.add_zone(target, self.placement, sizing);
        self.target = Some(target);
        self.state = HandleState::Attached(zone);
    }

    /// Reposition and resize in place
    ///
    /// Returns true when the host was asked to relayout.
    pub fn update(
        &mut self,
        host: &mut dyn ViewZoneHost,
        line: usize,
        height: Option<f32>,
        width: f32,
    ) -> bool {
        let mut placement = self.placement;
        placement.line = line;
        placement.width = width;
        if let Some(height) = height {
            placement.height = height;
        }
        self.relayout(host, placement)
    }

    pub(crate) fn relayout(&mut self, host: &mut dyn ViewZoneHost, placement: ZonePlacement) -> bool {
        if placement == self.placement || self.is_disposed() {
            return false;
        }
        self.placement = placement;
        match self.state {
            HandleState::Attached(zone) => {
                host.layout_zone(zone, placement);
                true
            }
            _ => false,
        }
    }

    /// Replace what the render target shows
    pub fn set_kind(&mut self, host: &mut dyn ViewZoneHost, kind: WidgetKind) -> bool {
        if kind == self.kind || self.is_disposed() {
            return false;
        }
        self.kind = kind;
        if let Some(target) = self.target {
            host.update_render_target(target, &self.kind);
        }
        true
    }

    /// Release the zone and the render target; a no-op after the first call
    pub fn dispose(&mut self, host: &mut dyn ViewZoneHost) {
        if let HandleState::Attached(zone) = self.state {
            host.remove_zone(zone);
        }
        if let Some(target) = self.target.take() {
            host.destroy_render_target(target);
        }
        self.state = HandleState::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::test_host::{HostCall, RecordingHost};

    fn form() -> FixedWidget {
        FixedWidget::new(
            WidgetId::parameter_form(),
            WidgetKind::ParameterForm {
                form_id: "params-form".into(),
                param_names: vec!["region".into()],
            },
            ZonePlacement::below(3, 92.0, 600.0),
        )
    }

    #[test]
    fn test_attach_reserves_exact_height() {
        let mut host = RecordingHost::default();
        let mut widget = form();
        assert_eq!(widget.state(), HandleState::Unattached);

        widget.attach(&mut host);
        assert!(widget.is_attached());
        let target = widget.render_target().unwrap();
        assert_eq!(host.zone_for(target).unwrap().height, 92.0);

        // Attaching twice does nothing
        widget.attach(&mut host);
        assert_eq!(host.count(|c| matches!(c, HostCall::AddZone(..))), 1);
    }

    #[test]
    fn test_update_in_place() {
        let mut host = RecordingHost::default();
        let mut widget = form();
        widget.attach(&mut host);
        let target = widget.render_target();

        assert!(!widget.update(&mut host, 3, None, 600.0));
        assert!(widget.update(&mut host, 5, Some(128.0), 600.0));

        assert_eq!(widget.render_target(), target);
        assert_eq!(widget.current_height(), 128.0);
        assert_eq!(host.count(|c| matches!(c, HostCall::LayoutZone(..))), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::RemoveZone(..))), 0);
    }

    #[test]
    fn test_dispose_twice() {
        let mut host = RecordingHost::default();
        let mut widget = form();
        widget.attach(&mut host);

        widget.dispose(&mut host);
        widget.dispose(&mut host);

        assert!(widget.is_disposed());
        assert_eq!(widget.render_target(), None);
        assert!(host.targets.is_empty());
        assert_eq!(host.count(|c| matches!(c, HostCall::RemoveZone(..))), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::DestroyTarget(..))), 1);

        // Disposal is terminal
        widget.attach(&mut host);
        assert!(!widget.is_attached());
    }

    #[test]
    fn test_dispose_unattached() {
        let mut host = RecordingHost::default();
        let mut widget = form();
        widget.dispose(&mut host);
        assert!(host.calls.is_empty());
        assert!(widget.is_disposed());
    }
}
