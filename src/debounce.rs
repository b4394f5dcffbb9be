use std::time::{Duration, Instant};

/// Delay between the last keystroke and the filter pass it triggers.
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(250);

/// Coalesces bursts of changes: only fires once `delay` has passed since the latest `touch`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    last_change: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_change: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// How long until a pending change is due, if any.
    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.last_change
            .map(|at| self.delay.saturating_sub(now.saturating_duration_since(at)))
    }

    /// True once per burst, when the delay has elapsed. Clears the pending state.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.last_change {
            Some(at) if now.saturating_duration_since(at) >= self.delay => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }

    /// Drops a pending change, e.g. when it was applied eagerly.
    pub fn cancel(&mut self) {
        self.last_change = None;
    }
}
