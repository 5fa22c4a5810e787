//! Content-sized widget handle

use bevy::prelude::*;
use std::time::Duration;

use super::{
    FixedWidget, HandleState, SizeWatcher, SizingPolicy, ViewZoneHost, WatcherConfig, WidgetId,
    WidgetKind, ZonePlacement,
};

/// Widget whose height follows its rendered children
///
/// Reserves `min_height` on attach, then tracks measurements through a
/// [`SizeWatcher`]. The reserved height always stays within `[min, max]`.
#[derive(Debug)]
pub struct DynamicWidget {
    inner: FixedWidget,
    config: WatcherConfig,
    watcher: Option<SizeWatcher>,
}

impl DynamicWidget {
    pub fn new(id: WidgetId, kind: WidgetKind, line: usize, width: f32, config: WatcherConfig) -> Self {
        let placement = ZonePlacement::below(line, config.min_height, width);
        Self {
            inner: FixedWidget::new(id, kind, placement),
            config,
            watcher: None,
        }
    }

    pub fn id(&self) -> &WidgetId {
        self.inner.id()
    }

    pub fn kind(&self) -> &WidgetKind {
        self.inner.kind()
    }

    pub fn state(&self) -> HandleState {
        self.inner.state()
    }

    pub fn render_target(&self) -> Option<Entity> {
        self.inner.render_target()
    }

    pub fn placement(&self) -> &ZonePlacement {
        self.inner.placement()
    }

    pub fn current_height(&self) -> f32 {
        self.inner.current_height()
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.config.min_height, self.config.max_height)
    }

    pub fn is_observing(&self, now: Duration) -> bool {
        self.watcher.as_ref().is_some_and(|w| w.is_observing(now))
    }

    /// Attach and start the watcher's grace period
    pub fn attach(&mut self, host: &mut dyn ViewZoneHost, now: Duration) {
        if self.inner.state() != HandleState::Unattached {
            return;
        }
        self.inner.attach_with(
            host,
            SizingPolicy::Dynamic {
                min: self.config.min_height,
                max: self.config.max_height,
            },
        );
        self.watcher = Some(SizeWatcher::new(self.config, now));
    }

    /// Move to a new anchor/width and apply new bounds
    ///
    /// The current height is re-clamped when the bounds shrink around it.
    pub fn update(
        &mut self,
        host: &mut dyn ViewZoneHost,
        line: usize,
        width: f32,
        min_height: f32,
        max_height: f32,
    ) -> bool {
        self.config.min_height = min_height;
        self.config.max_height = max_height.max(min_height);
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.set_bounds(min_height, max_height);
        }
        let height = self.config.clamp(self.inner.current_height());
        self.inner.update(host, line, Some(height), width)
    }

    pub fn set_kind(&mut self, host: &mut dyn ViewZoneHost, kind: WidgetKind) -> bool {
        self.inner.set_kind(host, kind)
    }

    /// Feed a content measurement
    pub fn observe(&mut self, measured: f32, now: Duration) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.observe(measured, now);
        }
    }

    /// Apply a settled measurement; true when the zone was resized
    pub fn poll(&mut self, host: &mut dyn ViewZoneHost, now: Duration) -> bool {
        let current = self.inner.current_height();
        let Some(height) = self.watcher.as_mut().and_then(|w| w.poll(now, current)) else {
            return false;
        };
        let mut placement = *self.inner.placement();
        placement.height = height;
        self.inner.relayout(host, placement)
    }

    /// Disconnect the watcher, then release the zone; idempotent
    pub fn dispose(&mut self, host: &mut dyn ViewZoneHost) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.disconnect();
        }
        self.inner.dispose(host);
    }
}
