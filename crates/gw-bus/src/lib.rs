//! Publish/subscribe transport for the custom device gateway
//!
//! The controller never talks to a broker directly. It publishes and
//! subscribes through the [`Transport`] trait and receives everything else as
//! [`BusEvent`]s on one channel, so the broker client can be swapped without
//! touching the state machine.
//!
//! [`MemoryBus`] is an in-process broker with MQTT semantics (wildcard
//! filters, retained messages, retained replay on subscribe). It backs the
//! test suites and can be used by embedders that do not need a network broker.

mod memory;

pub use memory::MemoryBus;

use gw_core::Message;
use std::sync::Arc;

/// Outbound side of the bus
///
/// Calls never block and never fail from the caller's perspective: the
/// transport is assumed reliable, and adapters log their own delivery errors.
pub trait Transport: Send + Sync {
    /// Publish a message
    fn publish(&self, message: Message);

    /// Subscribe to a topic filter (MQTT wildcards allowed)
    fn subscribe(&self, filter: &str);

    /// Drop a subscription
    fn unsubscribe(&self, filter: &str);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn publish(&self, message: Message) {
        (**self).publish(message)
    }

    fn subscribe(&self, filter: &str) {
        (**self).subscribe(filter)
    }

    fn unsubscribe(&self, filter: &str) {
        (**self).unsubscribe(filter)
    }
}

/// Inbound side of the bus, delivered to the controller in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Session (re)established; standing subscriptions must be renewed
    Connected,
    /// Session lost
    Disconnected,
    /// A message matching one of the subscriptions
    Message(Message),
}

/// Check whether a topic matches an MQTT subscription filter
///
/// `+` matches exactly one level, a trailing `#` matches the remaining levels
/// (including none).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
