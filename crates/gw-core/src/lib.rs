//! Core types for the custom device gateway
//!
//! This crate provides the vocabulary shared by every other crate: the
//! [`Message`] flowing over the bus, the [`DeviceEvent`] lifecycle names
//! published on the event topic, the restartable [`Debounce`] timer and topic
//! segment normalisation.

mod debounce;
mod event;
mod message;
mod topic;

pub use debounce::{earliest, Debounce};
pub use event::{DeviceEvent, EventPayload};
pub use message::Message;
pub use topic::{is_valid_segment, normalize_segment};

/// Endpoint id used for the single endpoint every device owns
pub const DEFAULT_ENDPOINT: u8 = 0;

/// Service version reported in status snapshots
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
