//! Catalog commands received on `command/<ns>`

use crate::controller::{Controller, Outcome};
use gw_bus::Transport;
use gw_core::{normalize_segment, DeviceEvent, Message};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct CommandRequest {
    action: String,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl<T: Transport> Controller<T> {
    pub(crate) fn handle_command(&mut self, message: &Message, now: Instant) -> Outcome {
        let Some(request) = message.json::<CommandRequest>() else {
            // our own retained command being cleared
            if !message.is_empty() {
                warn!(topic = %message.topic, "Malformed command: {}", message.payload_str());
            }
            return Outcome::Continue;
        };

        debug!(action = %request.action, device = ?request.device, "Command received");

        match request.action.as_str() {
            "restartService" => {
                warn!("Restart requested");
                self.transport
                    .publish(Message::retained(self.topics.command(), Vec::new()));
                return Outcome::Restart;
            }
            "updateDevice" => self.update_device(
                request.device.as_deref(),
                request.data.unwrap_or(Value::Null),
                now,
            ),
            "removeDevice" => self.remove_device(request.device.as_deref(), now),
            "getProperties" => self.get_properties(request.device.as_deref()),
            other => warn!(action = other, "Unknown command"),
        }

        Outcome::Continue
    }

    /// Add a device, or replace the one `target` names
    fn update_device(&mut self, target: Option<&str>, data: Value, now: Instant) {
        let editing = target.and_then(|t| self.devices.position(t));

        let id = normalize_segment(data.get("id").and_then(Value::as_str).unwrap_or_default());
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .map(normalize_segment)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.clone());

        let result = self
            .devices
            .check_names(editing, &id, &name)
            .and_then(|()| self.devices.parse(&data));

        let mut device = match result {
            Ok(device) => device,
            Err(e) => {
                let label = if name.is_empty() { target.unwrap_or_default() } else { name.as_str() };
                warn!(device = %label, "Device update rejected: {}", e);
                self.emit(label, e.event());
                return;
            }
        };

        let (index, event, force) = match editing.and_then(|i| self.devices.get(i).map(|d| (i, d))) {
            Some((index, old)) => {
                let renamed = old.id != device.id || old.name != device.name;

                if renamed {
                    self.emit_for(old, DeviceEvent::AboutToRename);
                }

                let force = renamed
                    || old.active != device.active
                    || old.availability_topic != device.availability_topic;
                device.endpoint.properties = old.endpoint.properties.clone();

                self.devices.replace_at(index, device);
                (index, DeviceEvent::Updated, force)
            }
            None => (self.devices.append(device), DeviceEvent::Added, false),
        };

        if let Some(device) = self.devices.get(index) {
            info!(device = %device.id, %event, "Device stored");
            self.emit_for(device, event);
        }

        self.announce(index, now, force);
        self.store.store_database(true, now);
        self.store.store_properties(now);
    }

    fn remove_device(&mut self, target: Option<&str>, now: Instant) {
        let Some(device) = target
            .and_then(|t| self.devices.position(t))
            .and_then(|index| self.devices.remove_at(index))
        else {
            warn!(device = target.unwrap_or_default(), "Remove requested for unknown device");
            return;
        };

        info!(device = %device.id, "Device removed");
        self.emit_for(&device, DeviceEvent::Removed);
        self.store.store_database(true, now);
        self.store.store_properties(now);
    }

    fn get_properties(&self, target: Option<&str>) {
        match target.and_then(|t| self.devices.lookup(t)) {
            Some((_, device)) if device.active => self.publish_properties(device),
            Some((_, device)) => debug!(device = %device.id, "Properties requested for inactive device"),
            None => warn!(device = target.unwrap_or_default(), "Properties requested for unknown device"),
        }
    }
}
