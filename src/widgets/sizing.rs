//! Coalescing size watcher for content-sized widgets
//!
//! Measurements are pushed in by whoever can see the rendered node (the
//! plugin reads `ComputedNode`); the watcher decides whether a measurement
//! should turn into a new reserved height.

use std::time::Duration;

use crate::settings::SizingObserverSettings;

/// Configuration of one watcher
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatcherConfig {
    pub min_height: f32,
    pub max_height: f32,
    /// Delay after attach before measurements are accepted
    pub grace: Duration,
    /// Trailing coalescing window
    pub debounce: Duration,
    /// Changes of this many pixels or fewer are ignored
    pub change_threshold_px: f32,
    /// Measurements below this are "not rendered yet"
    pub epsilon_px: f32,
}

impl WatcherConfig {
    pub fn new(min_height: f32, max_height: f32, observer: &SizingObserverSettings) -> Self {
        Self {
            min_height,
            max_height: max_height.max(min_height),
            grace: Duration::from_millis(observer.grace_ms),
            debounce: Duration::from_millis(observer.debounce_ms),
            change_threshold_px: observer.change_threshold_px,
            epsilon_px: observer.epsilon_px,
        }
    }

    pub fn clamp(&self, height: f32) -> f32 {
        height.clamp(self.min_height, self.max_height)
    }
}

/// Debounced, threshold-filtered height observer
#[derive(Clone, Debug)]
pub struct SizeWatcher {
    config: WatcherConfig,
    observing_from: Duration,
    last_measured: Option<f32>,
    /// Latest reading taken during the grace period, replayed when it ends
    deferred: Option<f32>,
    pending: Option<(f32, Duration)>,
    connected: bool,
}

impl SizeWatcher {
    /// Start watching; measurements are accepted after the grace delay
    pub fn new(config: WatcherConfig, attached_at: Duration) -> Self {
        Self {
            config,
            observing_from: attached_at + config.grace,
            last_measured: None,
            deferred: None,
            pending: None,
            connected: true,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn set_bounds(&mut self, min_height: f32, max_height: f32) {
        self.config.min_height = min_height;
        self.config.max_height = max_height.max(min_height);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_observing(&self, now: Duration) -> bool {
        self.connected && now >= self.observing_from
    }

    /// Feed a measurement of the rendered content height
    ///
    /// A reading taken during the grace period is held back and counts as
    /// the first observation once the period ends. Repeated identical
    /// measurements are not changes and are dropped.
    pub fn observe(&mut self, measured: f32, now: Duration) {
        if !self.connected {
            return;
        }
        if now < self.observing_from {
            self.deferred = Some(measured);
            return;
        }
        self.deferred = None;
        if self.last_measured == Some(measured) {
            return;
        }
        self.last_measured = Some(measured);
        // Last notification in the window wins
        self.pending = Some((measured, now));
    }

    /// Height to apply once the window has settled, if it is worth a relayout
    pub fn poll(&mut self, now: Duration, current_height: f32) -> Option<f32> {
        if self.is_observing(now) {
            if let Some(measured) = self.deferred.take() {
                self.last_measured = Some(measured);
                self.pending.get_or_insert((measured, self.observing_from));
            }
        }
        let (measured, at) = self.pending?;
        if !self.connected || now < at + self.config.debounce {
            return None;
        }
        self.pending = None;

        if measured < self.config.epsilon_px {
            return None;
        }

        let height = self.config.clamp(measured);
        ((height - current_height).abs() > self.config.change_threshold_px).then_some(height)
    }

    /// Stop observing; later measurements and polls are ignored
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.deferred = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn watcher() -> SizeWatcher {
        let config = WatcherConfig {
            min_height: 40.0,
            max_height: 300.0,
            grace: ms(100),
            debounce: ms(50),
            change_threshold_px: 2.0,
            epsilon_px: 1.0,
        };
        SizeWatcher::new(config, ms(0))
    }

    #[test]
    fn test_grace_delay() {
        let mut watcher = watcher();
        watcher.observe(120.0, ms(10));
        assert!(!watcher.is_observing(ms(10)));
        assert_eq!(watcher.poll(ms(90), 40.0), None);

        // Observation starts at 100ms, the held reading settles after the debounce
        assert_eq!(watcher.poll(ms(120), 40.0), None);
        assert_eq!(watcher.poll(ms(150), 40.0), Some(120.0));
        assert_eq!(watcher.poll(ms(300), 120.0), None);
    }

    #[test]
    fn test_reading_during_grace_is_replayed_once_static() {
        let mut watcher = watcher();
        watcher.observe(0.0, ms(0));
        watcher.observe(200.0, ms(60));

        // Content never changes again, so no further readings arrive
        assert_eq!(watcher.poll(ms(160), 40.0), Some(200.0));

        // The replayed reading counts as seen
        watcher.observe(200.0, ms(200));
        assert_eq!(watcher.poll(ms(300), 200.0), None);
    }

    #[test]
    fn test_reading_after_grace_replaces_held_one() {
        let mut watcher = watcher();
        watcher.observe(80.0, ms(50));
        watcher.observe(150.0, ms(110));
        assert_eq!(watcher.poll(ms(170), 40.0), Some(150.0));
        assert_eq!(watcher.poll(ms(400), 150.0), None);
    }

    #[test]
    fn test_debounce_keeps_last() {
        let mut watcher = watcher();
        watcher.observe(80.0, ms(100));
        watcher.observe(90.0, ms(120));
        watcher.observe(150.0, ms(140));

        assert_eq!(watcher.poll(ms(180), 40.0), None);
        assert_eq!(watcher.poll(ms(190), 40.0), Some(150.0));
        assert_eq!(watcher.poll(ms(300), 150.0), None);
    }

    #[test]
    fn test_zero_height_ignored() {
        let mut watcher = watcher();
        watcher.observe(0.0, ms(100));
        assert_eq!(watcher.poll(ms(200), 40.0), None);
    }

    #[test]
    fn test_clamp_and_threshold() {
        let mut watcher = watcher();
        watcher.observe(5000.0, ms(100));
        assert_eq!(watcher.poll(ms(150), 40.0), Some(300.0));

        watcher.observe(10.0, ms(200));
        assert_eq!(watcher.poll(ms(250), 300.0), Some(40.0));

        // Sub-threshold jitter
        watcher.observe(41.5, ms(300));
        assert_eq!(watcher.poll(ms(350), 40.0), None);
    }

    #[test]
    fn test_disconnect() {
        let mut watcher = watcher();
        watcher.observe(120.0, ms(100));
        watcher.disconnect();
        assert_eq!(watcher.poll(ms(500), 40.0), None);
        let mut held = self::watcher();
        held.observe(120.0, ms(10));
        held.disconnect();
        assert_eq!(held.poll(ms(500), 40.0), None);
        watcher.observe(200.0, ms(600));
        assert_eq!(watcher.poll(ms(700), 40.0), None);
        assert!(!watcher.is_connected());
    }
}
