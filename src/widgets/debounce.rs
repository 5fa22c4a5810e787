//! Trailing-edge debouncing on an externally supplied clock
//!
//! Debouncers carry no payload: whoever polls them re-reads the current
//! state when they fire.

use std::time::Duration;

/// Fires once `window` has elapsed since the last `schedule`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn from_millis(window_ms: u64) -> Self {
        Self::new(Duration::from_millis(window_ms))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)start the window at `now`
    pub fn schedule(&mut self, now: Duration) {
        self.deadline = Some(now + self.window);
    }

    /// Start the window only if nothing is pending
    pub fn schedule_once(&mut self, now: Duration) {
        if self.deadline.is_none() {
            self.schedule(now);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once when the window has elapsed
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_burst_coalesces_to_one_fire() {
        let mut debouncer = Debouncer::from_millis(100);
        debouncer.schedule(ms(0));
        debouncer.schedule(ms(60));
        debouncer.schedule(ms(120));

        assert!(!debouncer.fire(ms(200)));
        assert!(debouncer.fire(ms(220)));
        assert!(!debouncer.fire(ms(400)));
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::from_millis(50);
        debouncer.schedule(ms(0));
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(ms(1000)));
    }

    #[test]
    fn test_schedule_once_keeps_deadline() {
        let mut debouncer = Debouncer::from_millis(50);
        debouncer.schedule_once(ms(0));
        debouncer.schedule_once(ms(40));
        assert!(debouncer.fire(ms(50)));
    }
}
