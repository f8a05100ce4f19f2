//! Device lifecycle events published on `event/<ns>`

use serde::{Deserialize, Serialize};

/// Outcome of a catalog command, as announced on the event topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceEvent {
    /// Submitted id already belongs to another device
    IdDuplicate,
    /// Submitted name already belongs to another device
    NameDuplicate,
    /// Submitted definition lacks an id or exposes
    IncompleteData,
    /// Device is about to change its id or name
    AboutToRename,
    Added,
    Updated,
    Removed,
}

impl DeviceEvent {
    /// Get the wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceEvent::IdDuplicate => "idDuplicate",
            DeviceEvent::NameDuplicate => "nameDuplicate",
            DeviceEvent::IncompleteData => "incompleteData",
            DeviceEvent::AboutToRename => "aboutToRename",
            DeviceEvent::Added => "added",
            DeviceEvent::Updated => "updated",
            DeviceEvent::Removed => "removed",
        }
    }

    /// Whether this event is a rejected command that left the catalog untouched
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DeviceEvent::IdDuplicate | DeviceEvent::NameDuplicate | DeviceEvent::IncompleteData
        )
    }

    /// Whether the device's presence and capability topics are retracted
    pub fn retracts(&self) -> bool {
        matches!(self, DeviceEvent::AboutToRename | DeviceEvent::Removed)
    }
}

impl std::fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of a message on the event topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub device: String,
    pub event: DeviceEvent,
}

impl EventPayload {
    pub fn new(device: impl Into<String>, event: DeviceEvent) -> Self {
        Self {
            device: device.into(),
            event,
        }
    }
}
