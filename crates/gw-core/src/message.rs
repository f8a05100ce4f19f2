//! Messages exchanged with the publish/subscribe transport

use serde::de::DeserializeOwned;

/// A single bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Full topic name, prefix included
    pub topic: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Whether the broker keeps the message for late subscribers
    pub retain: bool,
}

impl Message {
    /// Create a non-retained message
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }

    /// Create a retained message
    pub fn retained(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            retain: true,
            ..Self::new(topic, payload)
        }
    }

    /// Payload as text, invalid UTF-8 replaced
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Parse the payload as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.payload).ok()
    }

    /// An empty payload clears a retained topic
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
