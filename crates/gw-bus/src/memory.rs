//! In-process broker with retained messages

use crate::{topic_matches, BusEvent, Transport};
use dashmap::{DashMap, DashSet};
use gw_core::Message;
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default channel capacity for deliveries to the client
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// An in-process broker serving a single client
///
/// The client (normally the controller) publishes and subscribes through the
/// [`Transport`] impl. Other parties reach the client with [`MemoryBus::inject`].
/// Everything the client publishes is also recorded so it can be inspected.
pub struct MemoryBus {
    /// Filters the client is subscribed to
    filters: DashSet<String>,
    /// Last retained payload per topic
    retained: DashMap<String, Vec<u8>>,
    /// Log of the client's own publications
    published: Mutex<Vec<Message>>,
    /// Messages routed to the client
    deliveries: broadcast::Sender<Message>,
}

impl MemoryBus {
    /// Create a new broker
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new broker with the given delivery channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (deliveries, _) = broadcast::channel(capacity);
        Self {
            filters: DashSet::new(),
            retained: DashMap::new(),
            published: Mutex::new(Vec::new()),
            deliveries,
        }
    }

    /// Receive the messages routed to the client
    pub fn deliveries(&self) -> broadcast::Receiver<Message> {
        self.deliveries.subscribe()
    }

    /// Publish a message on behalf of a third party
    ///
    /// Returns `true` if the client was subscribed to the topic.
    pub fn inject(&self, message: Message) -> bool {
        trace!(topic = %message.topic, "Injecting message");
        self.route(message)
    }

    /// Everything the client has published so far
    pub fn published(&self) -> Vec<Message> {
        self.published
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Drain the publication log
    pub fn take_published(&self) -> Vec<Message> {
        self.published
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    /// Publications on one exact topic
    pub fn published_to(&self, topic: &str) -> Vec<Message> {
        self.published()
            .into_iter()
            .filter(|message| message.topic == topic)
            .collect()
    }

    /// Current retained payload of a topic
    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.retained.get(topic).map(|r| r.value().clone())
    }

    /// Whether the client holds exactly this filter
    pub fn is_subscribed(&self, filter: &str) -> bool {
        self.filters.contains(filter)
    }

    /// All filters the client holds, sorted
    pub fn subscriptions(&self) -> Vec<String> {
        let mut filters: Vec<String> = self.filters.iter().map(|f| f.key().clone()).collect();
        filters.sort();
        filters
    }

    /// Forward deliveries into the controller's event channel
    ///
    /// Sends [`BusEvent::Connected`] first, like a broker session would.
    pub fn spawn_forwarder(&self, tx: mpsc::UnboundedSender<BusEvent>) -> JoinHandle<()> {
        let mut rx = self.deliveries();
        tokio::spawn(async move {
            if tx.send(BusEvent::Connected).is_err() {
                return;
            }
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if tx.send(BusEvent::Message(message)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Delivery channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            let _ = tx.send(BusEvent::Disconnected);
        })
    }

    /// Store retained state and deliver to the client if it is subscribed
    fn route(&self, message: Message) -> bool {
        if message.retain {
            if message.payload.is_empty() {
                self.retained.remove(&message.topic);
            } else {
                self.retained
                    .insert(message.topic.clone(), message.payload.clone());
            }
        }

        let subscribed = self
            .filters
            .iter()
            .any(|filter| topic_matches(filter.key(), &message.topic));

        if subscribed {
            // Ignore send errors - they just mean no active receivers
            let _ = self.deliveries.send(message);
        }

        subscribed
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryBus {
    fn publish(&self, message: Message) {
        debug!(topic = %message.topic, retain = message.retain, "Publishing message");
        if let Ok(mut log) = self.published.lock() {
            log.push(message.clone());
        }
        self.route(message);
    }

    fn subscribe(&self, filter: &str) {
        if !self.filters.insert(filter.to_string()) {
            return;
        }
        debug!(filter, "Subscribed");

        let replay: Vec<Message> = self
            .retained
            .iter()
            .filter(|entry| topic_matches(filter, entry.key()))
            .map(|entry| Message::retained(entry.key().clone(), entry.value().clone()))
            .collect();

        for message in replay {
            let _ = self.deliveries.send(message);
        }
    }

    fn unsubscribe(&self, filter: &str) {
        if self.filters.remove(filter).is_some() {
            debug!(filter, "Unsubscribed");
        }
    }
}
