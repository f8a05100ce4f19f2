//! Device and endpoint model

use crate::binding::{Binding, BindingRecord};
use crate::expose::{item_name, Expose, ExposeOptions};
use gw_core::{Debounce, DEFAULT_ENDPOINT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Settle delay between a real device's property change and its publish
pub const UPDATE_DEVICE_DELAY: Duration = Duration::from_millis(100);

fn default_true() -> bool {
    true
}

/// Persisted and operator-submitted shape of a device definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default)]
    pub real: bool,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default = "default_true")]
    pub discovery: bool,

    #[serde(default = "default_true")]
    pub cloud: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_pattern: Option<String>,

    #[serde(default)]
    pub exposes: Vec<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, BindingRecord>,
}

/// The single addressable sub-unit of a device
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    pub id: u8,
    pub exposes: Vec<Expose>,
    pub properties: Map<String, Value>,
    pub bindings: BTreeMap<String, Binding>,
}

/// A virtual or real device in the catalog
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub note: String,
    pub real: bool,
    pub active: bool,
    pub discovery: bool,
    pub cloud: bool,
    pub availability_topic: String,
    pub availability_pattern: String,
    pub options: Map<String, Value>,
    pub endpoint: Endpoint,
    /// Publish debounce for real devices
    pub timer: Debounce,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();

        Self {
            name: id.clone(),
            id,
            note: String::new(),
            real: false,
            active: true,
            discovery: true,
            cloud: true,
            availability_topic: String::new(),
            availability_pattern: String::new(),
            options: Map::new(),
            endpoint: Endpoint {
                id: DEFAULT_ENDPOINT,
                ..Default::default()
            },
            timer: Debounce::new(UPDATE_DEVICE_DELAY),
        }
    }

    /// Segment used in topics for this device
    pub fn topic_name(&self, names: bool) -> &str {
        if names {
            &self.name
        } else {
            &self.id
        }
    }

    pub fn has_expose(&self, name: &str) -> bool {
        self.endpoint.exposes.iter().any(|e| e.name == name)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.endpoint.properties
    }

    /// Store a property value; null removes it
    ///
    /// Returns true if the stored value changed.
    pub fn set_property(&mut self, key: &str, value: Value) -> bool {
        let properties = &mut self.endpoint.properties;

        if value.is_null() {
            return properties.remove(key).is_some();
        }

        if properties.get(key) == Some(&value) {
            return false;
        }

        properties.insert(key.to_string(), value);
        true
    }

    /// Value a toggle of `key` should write
    pub fn toggled(&self, key: &str) -> Value {
        match self.endpoint.properties.get(key).and_then(Value::as_str) {
            Some("on") => json!("off"),
            _ => json!("on"),
        }
    }

    pub fn binding(&self, key: &str) -> Option<&Binding> {
        self.endpoint.bindings.get(key)
    }

    /// Device-wide retain flag for outbound data
    pub fn retain(&self) -> bool {
        self.options
            .get("retain")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Foreign topics this device listens on
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();

        if !self.availability_topic.is_empty() {
            topics.push(self.availability_topic.clone());
        }

        for binding in self.endpoint.bindings.values() {
            if binding.has_inbound() && !topics.contains(&binding.in_topic) {
                topics.push(binding.in_topic.clone());
            }
        }

        topics
    }

    /// Capability advertisement payload
    pub fn expose_payload(&self) -> Value {
        let items: Vec<&str> = self.endpoint.exposes.iter().map(|e| e.name.as_str()).collect();
        let options: Map<String, Value> = self
            .endpoint
            .exposes
            .iter()
            .filter_map(|e| self.options.get(&e.name).map(|o| (e.name.clone(), o.clone())))
            .collect();

        json!({
            "common": {
                "items": items,
                "options": options,
            }
        })
    }

    /// Serialize for the catalog, dropping option entries equal to defaults
    pub fn to_record(&self, defaults: &ExposeOptions) -> DeviceRecord {
        let mut options = Map::new();

        for (key, value) in &self.options {
            match value {
                Value::Object(map) if self.has_expose(key) => {
                    let stripped = defaults.strip(item_name(key), map);
                    if !stripped.is_empty() {
                        options.insert(key.clone(), Value::Object(stripped));
                    }
                }
                other => {
                    options.insert(key.clone(), other.clone());
                }
            }
        }

        DeviceRecord {
            id: self.id.clone(),
            name: (self.name != self.id).then(|| self.name.clone()),
            note: (!self.note.is_empty()).then(|| self.note.clone()),
            real: self.real,
            active: self.active,
            discovery: self.discovery,
            cloud: self.cloud,
            availability_topic: (!self.availability_topic.is_empty())
                .then(|| self.availability_topic.clone()),
            availability_pattern: (!self.availability_pattern.is_empty())
                .then(|| self.availability_pattern.clone()),
            exposes: self.endpoint.exposes.iter().map(|e| e.name.clone()).collect(),
            options,
            bindings: self
                .endpoint
                .bindings
                .iter()
                .map(|(key, binding)| (key.clone(), binding.to_record()))
                .collect(),
        }
    }
}
