//! Device traffic: `fd/`, `td/`, binding and availability topics

use crate::controller::Controller;
use gw_bus::Transport;
use gw_core::Message;
use gw_pattern::{evaluate, render};
use gw_registry::{item_name, Binding};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Payload that flips a status property instead of being stored
const TOGGLE: &str = "toggle";

fn is_status(key: &str) -> bool {
    item_name(key) == "status"
}

/// Render a property value through a binding's outbound pattern
///
/// Returns None when the pattern yields null.
fn transform_out(binding: &Binding, value: &Value) -> Option<Message> {
    let output = evaluate(&binding.out_pattern, render(value).as_bytes());

    if output.is_null() {
        return None;
    }

    Some(Message {
        topic: binding.out_topic.clone(),
        payload: render(&output).into_bytes(),
        retain: binding.retain,
    })
}

impl<T: Transport> Controller<T> {
    /// Property writes arriving on the from-device topic
    ///
    /// Only virtual devices take data here; for real devices the topic
    /// carries the gateway's own snapshots.
    pub(crate) fn handle_from_device(&mut self, target: &str, message: &Message, now: Instant) {
        let Some(data) = message.json::<Map<String, Value>>() else {
            trace!(topic = %message.topic, "Ignoring non-object payload");
            return;
        };

        let Some(device) = self
            .devices
            .position(target)
            .and_then(|index| self.devices.get_mut(index))
        else {
            trace!(device = %target, "Data for unknown device");
            return;
        };

        if device.real || !device.active {
            return;
        }

        let mut changed = false;
        for (key, value) in data {
            changed |= device.set_property(&key, value);
        }

        if changed {
            self.store.store_properties(now);
        }
    }

    /// Commands for a device
    ///
    /// Virtual devices store the values and republish their snapshot. Real
    /// devices forward values with an outbound binding to the native topic
    /// and store the rest locally.
    pub(crate) fn handle_to_device(&mut self, target: &str, message: &Message, now: Instant) {
        let Some(data) = message.json::<Map<String, Value>>() else {
            debug!(topic = %message.topic, "Ignoring non-object command");
            return;
        };

        let Some(index) = self.devices.position(target) else {
            debug!(device = %target, "Command for unknown device");
            return;
        };

        let Some(device) = self.devices.get_mut(index) else {
            return;
        };

        if !device.active {
            debug!(device = %device.id, "Command for inactive device");
            return;
        }

        let real = device.real;
        let mut changed = false;
        let mut outbound = Vec::new();

        for (key, value) in data {
            let value = if is_status(&key) && value == TOGGLE {
                device.toggled(&key)
            } else {
                value
            };

            match device.binding(&key).filter(|b| real && b.has_outbound()) {
                Some(binding) => outbound.extend(transform_out(binding, &value)),
                None => changed |= device.set_property(&key, value),
            }
        }

        if real && changed {
            device.timer.restart(now);
        }

        for message in outbound {
            debug!(topic = %message.topic, "Forwarding command to device");
            self.transport.publish(message);
        }

        if !real {
            if let Some(device) = self.devices.get(index) {
                self.publish_properties(device);
            }
        }

        if changed {
            self.store.store_properties(now);
        }
    }

    /// Anything outside the gateway's topic families
    pub(crate) fn handle_foreign(&mut self, message: &Message, now: Instant) {
        if self.hub_status.as_deref() == Some(message.topic.as_str()) && message.payload == b"online" {
            debug!("Hub is online, scheduling refresh");
            self.refresh.restart(now);
        }

        let mut presence = Vec::new();
        let mut changed = false;

        for (index, device) in self.devices.iter_mut().enumerate() {
            if !device.real || !device.active {
                continue;
            }

            if !device.availability_topic.is_empty() && device.availability_topic == message.topic {
                let status = evaluate(&device.availability_pattern, &message.payload);
                presence.push((index, render(&status) == "online"));
            }

            let updates: Vec<(String, Value)> = device
                .endpoint
                .bindings
                .iter()
                .filter(|(_, binding)| binding.has_inbound() && binding.in_topic == message.topic)
                .map(|(key, binding)| (key.clone(), evaluate(&binding.in_pattern, &message.payload)))
                .collect();

            let mut updated = false;
            for (key, value) in updates {
                updated |= device.set_property(&key, value);
            }

            if updated {
                trace!(device = %device.id, topic = %message.topic, "Properties updated from binding");
                device.timer.restart(now);
                changed = true;
            }
        }

        if changed {
            self.store.store_properties(now);
        }

        for (index, online) in presence {
            if let Some(device) = self.devices.get(index) {
                self.publish_presence(device, online);
            }
        }
    }
}
