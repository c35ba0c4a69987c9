//! Guard clock
//!
//! Elapsed-time debounce for advance requests. Reads time from
//! `tokio::time::Instant` so paused-clock tests control it.

use std::time::Duration;

use tokio::time::Instant;

/// Time since the last accepted advance request.
///
/// The very first request is always admitted regardless of elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct GuardClock {
    started_at: Instant,
    not_called_yet: bool,
}

impl GuardClock {
    /// Creates a clock that has not admitted any request yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            not_called_yet: true,
        }
    }

    /// Time since the clock was created or last restarted.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether no request has been admitted yet.
    #[must_use]
    pub const fn not_called_yet(&self) -> bool {
        self.not_called_yet
    }

    /// Whether a request arriving now passes a guard of `threshold`.
    ///
    /// The comparison is strict: a request at exactly `threshold` is refused.
    #[must_use]
    pub fn admits(&self, threshold: Duration) -> bool {
        self.not_called_yet || self.elapsed() > threshold
    }

    /// Records an accepted request: clears the first-call flag and restarts
    /// the clock from zero.
    pub fn restart(&mut self) {
        self.not_called_yet = false;
        self.started_at = Instant::now();
    }
}

impl Default for GuardClock {
    fn default() -> Self {
        Self::new()
    }
}
