//! Error types for catalog operations

use gw_core::DeviceEvent;
use thiserror::Error;

/// Result type for catalog operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Reasons a device definition is rejected
///
/// None of these mutate the catalog; each maps onto a lifecycle event.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Definition has no id or no exposes
    #[error("device definition is missing an id or exposes")]
    IncompleteData,

    /// Definition has fields of the wrong shape
    #[error("invalid device definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    /// Id already belongs to another device
    #[error("device id '{id}' is already in use")]
    DuplicateId { id: String },

    /// Name already belongs to another device
    #[error("device name '{name}' is already in use")]
    DuplicateName { name: String },
}

impl RegistryError {
    /// Lifecycle event announcing the rejection
    pub fn event(&self) -> DeviceEvent {
        match self {
            RegistryError::IncompleteData | RegistryError::InvalidDefinition(_) => {
                DeviceEvent::IncompleteData
            }
            RegistryError::DuplicateId { .. } => DeviceEvent::IdDuplicate,
            RegistryError::DuplicateName { .. } => DeviceEvent::NameDuplicate,
        }
    }
}
