//! The device catalog
//!
//! Devices live in an ordered arena and are addressed by position. Lookup by
//! id or name is linear; catalogs are small.

use crate::binding::Binding;
use crate::device::{Device, DeviceRecord};
use crate::error::{RegistryError, RegistryResult};
use crate::expose::{item_name, Expose, ExposeKind, ExposeOptions};
use gw_core::normalize_segment;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Ordered collection of devices plus the expose option defaults
#[derive(Debug, Default)]
pub struct DeviceList {
    devices: Vec<Device>,
    expose_options: ExposeOptions,
    names: bool,
}

impl DeviceList {
    pub fn new(expose_options: ExposeOptions, names: bool) -> Self {
        Self {
            devices: Vec::new(),
            expose_options,
            names,
        }
    }

    /// Whether topics address devices by name instead of id
    pub fn names(&self) -> bool {
        self.names
    }

    pub fn expose_options(&self) -> &ExposeOptions {
        &self.expose_options
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.devices.get_mut(index)
    }

    /// Find a device by id or name
    pub fn lookup(&self, identifier: &str) -> Option<(usize, &Device)> {
        self.devices
            .iter()
            .enumerate()
            .find(|(_, d)| d.id == identifier || d.name == identifier)
    }

    /// Position of the device a topic segment addresses
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.lookup(identifier).map(|(index, _)| index)
    }

    /// Check that a proposed id and name do not belong to another device
    ///
    /// `editing` is the position of the device being replaced, if any; that
    /// device may keep its own id and name.
    pub fn check_names(&self, editing: Option<usize>, id: &str, name: &str) -> RegistryResult<()> {
        let others = || {
            self.devices
                .iter()
                .enumerate()
                .filter(move |(index, _)| Some(*index) != editing)
                .map(|(_, d)| d)
        };

        if !id.is_empty() && others().any(|d| d.id == id || d.name == id) {
            return Err(RegistryError::DuplicateId { id: id.to_string() });
        }

        if !name.is_empty() && others().any(|d| d.id == name || d.name == name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }

        Ok(())
    }

    pub fn check_identity(&self, editing: Option<usize>, device: &Device) -> RegistryResult<()> {
        self.check_names(editing, &device.id, &device.name)
    }

    pub fn append(&mut self, device: Device) -> usize {
        debug!("Device '{}' added", device.id);
        self.devices.push(device);
        self.devices.len() - 1
    }

    /// Replace the device at `index`, returning the previous one
    pub fn replace_at(&mut self, index: usize, device: Device) -> Option<Device> {
        let slot = self.devices.get_mut(index)?;
        debug!("Device '{}' replaced by '{}'", slot.id, device.id);
        Some(std::mem::replace(slot, device))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Device> {
        if index >= self.devices.len() {
            return None;
        }

        let device = self.devices.remove(index);
        debug!("Device '{}' removed", device.id);
        Some(device)
    }

    /// Build a device from a JSON definition
    ///
    /// Does not check identity against the catalog.
    pub fn parse(&self, definition: &Value) -> RegistryResult<Device> {
        let record: DeviceRecord = serde_json::from_value(definition.clone())?;
        self.parse_record(record)
    }

    pub fn parse_record(&self, record: DeviceRecord) -> RegistryResult<Device> {
        let id = normalize_segment(&record.id);
        let exposes: Vec<String> = record
            .exposes
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if id.is_empty() || exposes.is_empty() {
            return Err(RegistryError::IncompleteData);
        }

        let mut device = Device::new(id);

        if let Some(name) = record.name.as_deref().map(normalize_segment) {
            if !name.is_empty() {
                device.name = name;
            }
        }

        device.note = record.note.unwrap_or_default();
        device.real = record.real;
        device.active = record.active;
        device.discovery = record.discovery;
        device.cloud = record.cloud;
        device.options = record.options;

        for name in exposes {
            if device.has_expose(&name) {
                continue;
            }

            let item = item_name(&name);
            let options = self.expose_options.merge(item, device.options.get(&name));
            let kind = ExposeKind::resolve(item, &options);

            if !options.is_empty() {
                device.options.insert(name.clone(), Value::Object(options));
            }

            device.endpoint.exposes.push(Expose::new(name, kind));
        }

        // virtual devices are always online and have nothing to bind
        if device.real {
            device.availability_topic = record
                .availability_topic
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            device.availability_pattern = record.availability_pattern.unwrap_or_default();

            for (key, record) in record.bindings {
                if let Some(binding) = Binding::from_record(record) {
                    device.endpoint.bindings.insert(key, binding);
                }
            }
        }

        Ok(device)
    }

    /// Load devices from catalog records
    ///
    /// Records that fail to parse or collide with an earlier one are skipped.
    /// Returns the number of devices loaded.
    pub fn restore_devices(&mut self, records: &[Value]) -> usize {
        let mut loaded = 0;

        for record in records {
            let device = match self.parse(record) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Skipping stored device: {}", e);
                    continue;
                }
            };

            if let Err(e) = self.check_identity(None, &device) {
                warn!("Skipping stored device: {}", e);
                continue;
            }

            self.devices.push(device);
            loaded += 1;
        }

        loaded
    }

    /// Apply stored property snapshots to loaded devices
    pub fn restore_properties(&mut self, snapshot: &Map<String, Value>) {
        for (id, properties) in snapshot {
            let Some(device) = self.devices.iter_mut().find(|d| d.id == *id) else {
                debug!("Stored properties for unknown device '{}'", id);
                continue;
            };

            if let Value::Object(properties) = properties {
                device.endpoint.properties = properties.clone();
            }
        }
    }

    pub fn serialize_devices(&self) -> Vec<DeviceRecord> {
        self.devices
            .iter()
            .map(|d| d.to_record(&self.expose_options))
            .collect()
    }

    /// Property snapshot keyed by device id, skipping empty ones
    pub fn serialize_properties(&self) -> Map<String, Value> {
        self.devices
            .iter()
            .filter(|d| !d.properties().is_empty())
            .map(|d| (d.id.clone(), Value::Object(d.properties().clone())))
            .collect()
    }
}
