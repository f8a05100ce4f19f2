//! Restartable one-shot timers
//!
//! Timers do not run on their own: the owner asks for the [`Debounce::deadline`]
//! to know when to wake up and calls [`Debounce::fire`] with the current time.
//! Restarting replaces the previous deadline, so a burst of triggers collapses
//! into a single expiry.

use std::time::Duration;
use tokio::time::Instant;

/// A single-shot timer with cancel-on-reschedule semantics
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    /// Create an idle timer with the given delay
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Create an idle timer from a delay in milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the timer, dropping any earlier deadline
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Start the timer with a one-off delay
    pub fn restart_with(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the expiry if it is due at `now`
    ///
    /// Returns `true` at most once per (re)start.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}
