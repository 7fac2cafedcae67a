#![forbid(unsafe_code)]

//! Trailing-edge rate limiter for scroll handling.
//!
//! Scroll events only *mark* work as pending. The work itself runs when the
//! host polls after the window deadline, so a burst of events collapses into
//! one evaluation that observes the latest state.
//!
//! # Contract
//!
//! 1. **Trailing**: the first event of a burst opens a window of `interval`;
//!    nothing fires before the window closes.
//! 2. **At-least-latest**: once an event is noted, a poll at or after the
//!    deadline fires, even if no further events arrive.
//! 3. **Bounded rate**: two firings are at least `interval` apart.
//!
//! ```ignore
//! let mut throttle = ScrollThrottle::new(Duration::from_millis(100));
//! throttle.notify_at(t0);
//! throttle.notify_at(t0 + 30ms);
//! assert!(!throttle.poll_at(t0 + 50ms));
//! assert!(throttle.poll_at(t0 + 100ms)); // one evaluation for both events
//! ```

use std::time::Duration;

use web_time::Instant;

/// Trailing, at-least-latest scroll throttle.
#[derive(Debug, Clone)]
pub struct ScrollThrottle {
    interval: Duration,
    /// Deadline of the open window, if an event is pending.
    deadline: Option<Instant>,
    last_fired: Option<Instant>,
    /// Events noted in the open window.
    coalesced: u64,
    total_fired: u64,
}

impl ScrollThrottle {
    /// Create a throttle with the given minimum spacing between firings.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            last_fired: None,
            coalesced: 0,
            total_fired: 0,
        }
    }

    /// Note a scroll event at `now`.
    pub fn notify_at(&mut self, now: Instant) {
        self.coalesced += 1;
        if self.deadline.is_some() {
            return;
        }
        let mut deadline = now + self.interval;
        if let Some(last) = self.last_fired {
            deadline = deadline.max(last + self.interval);
        }
        self.deadline = Some(deadline);
    }

    /// Whether the pending work should run now. Firing closes the window.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.last_fired = Some(now);
                self.coalesced = 0;
                self.total_fired += 1;
                true
            }
            _ => false,
        }
    }

    /// When the host should poll next, if anything is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether an event is waiting for its window to close.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Events folded into the currently open window.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Total firings since creation.
    #[must_use]
    pub fn total_fired(&self) -> u64 {
        self.total_fired
    }

    /// The configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drop any pending window.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.coalesced = 0;
    }
}
