//! Test harness for the controller
//!
//! Drives a controller over a [`MemoryBus`] with a virtual clock: messages
//! are handled directly and timers only fire when the test advances time.

#![allow(dead_code)]

use gw_bus::MemoryBus;
use gw_controller::{Controller, ControllerSettings, Outcome};
use gw_core::Message;
use gw_registry::{DeviceList, ExposeOptions, Store};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

pub const COMMAND: &str = "homed/command/custom";
pub const EVENT: &str = "homed/event/custom";
pub const STATUS: &str = "homed/status/custom";
pub const HUB_STATUS: &str = "homeassistant/status";

pub fn presence_topic(device: &str) -> String {
    format!("homed/device/custom/{}", device)
}

pub fn expose_topic(device: &str) -> String {
    format!("homed/expose/custom/{}", device)
}

pub fn fd_topic(device: &str) -> String {
    format!("homed/fd/custom/{}", device)
}

pub fn td_topic(device: &str) -> String {
    format!("homed/td/custom/{}", device)
}

pub struct TestGateway {
    pub bus: Arc<MemoryBus>,
    pub controller: Controller<Arc<MemoryBus>>,
    pub dir: TempDir,
    pub now: Instant,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_names() -> Self {
        Self::build(true)
    }

    /// Gateway over an existing storage directory
    pub fn in_dir(dir: TempDir) -> Self {
        Self::assemble(dir, false, None)
    }

    /// Gateway over an existing storage directory, following the hub status
    pub fn hub_in_dir(dir: TempDir) -> Self {
        Self::assemble(dir, false, Some(HUB_STATUS.to_string()))
    }

    fn build(names: bool) -> Self {
        Self::assemble(TempDir::new().unwrap(), names, None)
    }

    fn assemble(dir: TempDir, names: bool, hub_status: Option<String>) -> Self {
        let bus = Arc::new(MemoryBus::new());
        let store = Store::new(dir.path().join("database.json"), dir.path().join("properties.json"));
        let devices = DeviceList::new(ExposeOptions::builtin(), names);
        let settings = ControllerSettings {
            hub_status,
            ..Default::default()
        };

        Self {
            controller: Controller::new(bus.clone(), settings, devices, store),
            bus,
            dir,
            now: Instant::now(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.path().join("database.json")
    }

    pub fn properties_path(&self) -> PathBuf {
        self.dir.path().join("properties.json")
    }

    pub fn send_raw(&mut self, topic: &str, payload: &[u8]) -> Outcome {
        self.controller
            .handle_message(&Message::new(topic, payload.to_vec()), self.now)
    }

    pub fn send(&mut self, topic: &str, payload: Value) -> Outcome {
        self.send_raw(topic, payload.to_string().as_bytes())
    }

    pub fn command(&mut self, action: &str, device: Option<&str>, data: Option<Value>) -> Outcome {
        let mut request = json!({ "action": action });

        if let Some(device) = device {
            request["device"] = json!(device);
        }

        if let Some(data) = data {
            request["data"] = data;
        }

        self.send(COMMAND, request)
    }

    pub fn add(&mut self, definition: Value) {
        self.command("updateDevice", None, Some(definition));
    }

    /// Move the clock forward and run whatever timers are due
    pub async fn advance(&mut self, millis: u64) {
        self.now += Duration::from_millis(millis);
        self.controller.poll_timers(self.now).await;
    }

    /// Lifecycle events published so far, as `(device, event)` pairs
    pub fn events(&self) -> Vec<(String, String)> {
        self.bus
            .published_to(EVENT)
            .iter()
            .filter_map(|m| m.json::<Value>())
            .map(|v| {
                (
                    v["device"].as_str().unwrap_or_default().to_string(),
                    v["event"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    /// Last JSON payload published on a topic
    pub fn last_json(&self, topic: &str) -> Option<Value> {
        self.bus
            .published_to(topic)
            .last()
            .and_then(|m| m.json::<Value>())
    }

    /// Retained payload of a topic, parsed
    pub fn retained_json(&self, topic: &str) -> Option<Value> {
        self.bus
            .retained(topic)
            .and_then(|payload| serde_json::from_slice(&payload).ok())
    }

    pub fn properties(&self, device: &str) -> Value {
        self.controller
            .devices()
            .lookup(device)
            .map(|(_, d)| Value::Object(d.properties().clone()))
            .unwrap_or(Value::Null)
    }

    pub fn clear(&self) {
        self.bus.take_published();
    }
}

pub fn event(device: &str, event: &str) -> (String, String) {
    (device.to_string(), event.to_string())
}
