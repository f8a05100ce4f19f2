//! Deduplicated, delayed subscriptions to foreign topics

use gw_bus::Transport;
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Delay window for device topic subscriptions, in milliseconds
pub const SUBSCRIBE_JITTER: RangeInclusive<u64> = 50..=250;

/// Tracks which filters have been requested in the current session
#[derive(Debug, Default)]
pub struct Subscriptions {
    requested: HashSet<String>,
    pending: Vec<(Instant, String)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the next session starts from scratch
    pub fn reset(&mut self) {
        self.requested.clear();
        self.pending.clear();
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.requested.contains(filter)
    }

    /// Subscribe right away unless already requested
    pub fn subscribe_now<T: Transport>(&mut self, transport: &T, filter: &str) {
        if self.requested.insert(filter.to_string()) {
            transport.subscribe(filter);
        }
    }

    /// Subscribe after a short random delay
    ///
    /// Requesting a known filter is a no-op unless `force` is set, in which
    /// case the old subscription is dropped first.
    pub fn request<T: Transport>(&mut self, transport: &T, filter: &str, now: Instant, force: bool) {
        if self.requested.contains(filter) {
            if !force {
                return;
            }

            debug!(filter, "Forcing resubscription");
            transport.unsubscribe(filter);
            self.pending.retain(|(_, pending)| pending != filter);
        }

        let delay = Duration::from_millis(rand::thread_rng().gen_range(SUBSCRIBE_JITTER));
        self.requested.insert(filter.to_string());
        self.pending.push((now + delay, filter.to_string()));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(deadline, _)| *deadline).min()
    }

    /// Subscribe every filter whose delay has passed
    pub fn poll<T: Transport>(&mut self, transport: &T, now: Instant) -> usize {
        let mut due = 0;

        self.pending.retain(|(deadline, filter)| {
            if *deadline > now {
                return true;
            }

            transport.subscribe(filter);
            due += 1;
            false
        });

        due
    }
}
