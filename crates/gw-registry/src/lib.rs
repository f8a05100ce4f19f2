//! Device catalog for the custom device gateway
//!
//! This crate owns the device model and its persistence:
//! - Devices with their single default endpoint (DeviceList, Device, Endpoint)
//! - Capability descriptors resolved from a static kind registry (Expose, ExposeKind)
//! - Per-property transform pairs for real devices (Binding)
//! - Debounced JSON persistence of the catalog and live properties (Store)
//!
//! The catalog is a plain arena: devices are addressed by their position and
//! own their endpoint, exposes and bindings inline.

mod binding;
mod device;
mod device_list;
mod error;
mod expose;
pub mod storage;
mod store;

pub use binding::{Binding, BindingRecord};
pub use device::{Device, DeviceRecord, Endpoint};
pub use device_list::DeviceList;
pub use error::{RegistryError, RegistryResult};
pub use expose::{item_name, Expose, ExposeKind, ExposeOptions};
pub use storage::{JsonFile, StorageError, StorageResult};
pub use store::{StatusSnapshot, Store, STORE_DATABASE_DELAY, STORE_PROPERTIES_DELAY};
