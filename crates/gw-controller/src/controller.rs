//! The synchronization controller
//!
//! One controller owns the catalog, the store and every timer. Bus events and
//! timer expiries are handled one at a time, so no handler ever observes a
//! half-applied change.

use crate::subscriptions::Subscriptions;
use crate::topics::{Route, Topics};
use gw_bus::{BusEvent, Transport};
use gw_core::{earliest, Debounce, DeviceEvent, EventPayload, Message};
use gw_registry::{Device, DeviceList, Store};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Delay between the hub coming online and the full property refresh
pub const UPDATE_PROPERTIES_DELAY: Duration = Duration::from_millis(1000);

/// Static settings of a controller instance
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub prefix: String,
    pub namespace: String,
    /// Hub status topic; `online` on it schedules a full refresh
    pub hub_status: Option<String>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            prefix: "homed".to_string(),
            namespace: "custom".to_string(),
            hub_status: None,
        }
    }
}

/// Result of handling one bus message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// A restart was requested over the bus
    Restart,
}

/// Why [`Controller::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Restart,
}

pub struct Controller<T: Transport> {
    pub(crate) transport: T,
    pub(crate) topics: Topics,
    pub(crate) hub_status: Option<String>,
    pub(crate) devices: DeviceList,
    pub(crate) store: Store,
    pub(crate) subscriptions: Subscriptions,
    /// Full refresh after the hub comes online
    pub(crate) refresh: Debounce,
}

impl<T: Transport> Controller<T> {
    pub fn new(transport: T, settings: ControllerSettings, devices: DeviceList, store: Store) -> Self {
        Self {
            transport,
            topics: Topics::new(settings.prefix, settings.namespace),
            hub_status: settings.hub_status,
            devices,
            store,
            subscriptions: Subscriptions::new(),
            refresh: Debounce::new(UPDATE_PROPERTIES_DELAY),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Read the stored catalog and properties
    pub async fn load(&mut self) -> usize {
        self.store.load(&mut self.devices).await
    }

    /// Start of a bus session
    pub fn connected(&mut self, now: Instant) {
        info!("Bus connected, announcing {} devices", self.devices.len());
        self.subscriptions.reset();

        for filter in self.topics.standing() {
            self.subscriptions.subscribe_now(&self.transport, &filter);
        }

        if let Some(status) = &self.hub_status {
            self.subscriptions.subscribe_now(&self.transport, status);
        }

        for index in 0..self.devices.len() {
            self.announce(index, now, false);
        }

        self.store.store_database(true, now);
    }

    pub fn disconnected(&mut self) {
        warn!("Bus disconnected");
        self.subscriptions.reset();
    }

    /// Handle one inbound message
    pub fn handle_message(&mut self, message: &Message, now: Instant) -> Outcome {
        match self.topics.route(&message.topic) {
            Route::Command => return self.handle_command(message, now),
            Route::FromDevice(device) => self.handle_from_device(device, message, now),
            Route::ToDevice(device) => self.handle_to_device(device, message, now),
            Route::Foreign => self.handle_foreign(message, now),
        }

        Outcome::Continue
    }

    /// Earliest moment [`Controller::poll_timers`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            [
                self.store.next_deadline(),
                self.subscriptions.next_deadline(),
                self.refresh.deadline(),
            ]
            .into_iter()
            .chain(self.devices.iter().map(|d| d.timer.deadline())),
        )
    }

    /// Run every timer that is due at `now`
    pub async fn poll_timers(&mut self, now: Instant) {
        self.subscriptions.poll(&self.transport, now);

        let refresh = self.refresh.fire(now);
        if refresh {
            debug!("Refreshing properties of all active devices");
        }

        let settled: Vec<bool> = self.devices.iter_mut().map(|d| d.timer.fire(now)).collect();

        for (device, settled) in self.devices.iter().zip(settled) {
            if settled || (refresh && device.active) {
                self.publish_properties(device);
            }
        }

        if let Some(status) = self.store.poll(now, &self.devices).await {
            self.publish_json(self.topics.status(), &status, true);
        }
    }

    /// Mark every announced device offline and write pending state
    pub async fn quit(&mut self) {
        info!("Shutting down");

        for device in self.devices.iter() {
            // already announced offline
            if device.real && !device.active {
                continue;
            }

            self.publish_presence(device, false);
        }

        let status = self.store.flush(&self.devices).await;
        self.publish_json(self.topics.status(), &status, true);
    }

    /// Consume bus events until shutdown, a restart request or the end of the
    /// event stream
    pub async fn run<F>(&mut self, mut events: mpsc::UnboundedReceiver<BusEvent>, shutdown: F) -> Exit
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let exit = loop {
            let deadline = self.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(BusEvent::Connected) => self.connected(Instant::now()),
                    Some(BusEvent::Disconnected) => self.disconnected(),
                    Some(BusEvent::Message(message)) => {
                        if self.handle_message(&message, Instant::now()) == Outcome::Restart {
                            break Exit::Restart;
                        }
                    }
                    None => {
                        info!("Bus event stream closed");
                        break Exit::Quit;
                    }
                },
                _ = sleep_until(deadline) => self.poll_timers(Instant::now()).await,
                _ = &mut shutdown => break Exit::Quit,
            }
        };

        self.quit().await;
        exit
    }

    /// Publish a device's advertisement and presence and request its topics
    ///
    /// `force` renews the availability subscription so a retained
    /// availability message is replayed.
    pub(crate) fn announce(&mut self, index: usize, now: Instant, force: bool) {
        let Some(device) = self.devices.get(index) else {
            return;
        };

        self.publish_exposes(device);

        if let Some(online) = initial_presence(device) {
            self.publish_presence(device, online);
        }

        if device.real && !device.active {
            return;
        }

        for topic in device.subscriptions() {
            let force = force && topic == device.availability_topic;
            self.subscriptions.request(&self.transport, &topic, now, force);
        }
    }

    pub(crate) fn publish_json<S: Serialize>(&self, topic: String, value: &S, retain: bool) {
        match serde_json::to_vec(value) {
            Ok(payload) => self.transport.publish(Message {
                topic,
                payload,
                retain,
            }),
            Err(e) => warn!(topic = %topic, "Failed to encode payload: {}", e),
        }
    }

    fn device_topic_name<'a>(&self, device: &'a Device) -> &'a str {
        device.topic_name(self.devices.names())
    }

    pub(crate) fn publish_presence(&self, device: &Device, online: bool) {
        let status = if online { "online" } else { "offline" };
        let topic = self.topics.device(self.device_topic_name(device));
        self.publish_json(topic, &json!({ "status": status }), true);
    }

    pub(crate) fn publish_exposes(&self, device: &Device) {
        let topic = self.topics.expose(self.device_topic_name(device));
        self.publish_json(topic, &device.expose_payload(), true);
    }

    /// Publish the property snapshot, if there is one
    pub(crate) fn publish_properties(&self, device: &Device) {
        if device.properties().is_empty() {
            return;
        }

        let topic = self.topics.from_device(self.device_topic_name(device));
        self.publish_json(topic, device.properties(), device.retain());
    }

    /// Announce a lifecycle event by device name
    pub(crate) fn emit(&self, name: &str, event: DeviceEvent) {
        debug!(device = %name, %event, "Device event");
        self.publish_json(self.topics.event(), &EventPayload::new(name, event), false);
    }

    /// Announce a lifecycle event of a catalog device, retracting its
    /// retained topics when the event calls for it
    pub(crate) fn emit_for(&self, device: &Device, event: DeviceEvent) {
        if event.retracts() {
            let name = self.device_topic_name(device);
            self.transport.publish(Message::retained(self.topics.device(name), Vec::new()));
            self.transport.publish(Message::retained(self.topics.expose(name), Vec::new()));
        }

        self.emit(&device.name, event);
    }
}

/// Presence to announce when a device is (re)registered
///
/// Real devices with an availability topic wait for it instead. Inactive
/// real devices are offline until they are activated.
fn initial_presence(device: &Device) -> Option<bool> {
    match (device.real, device.active) {
        (false, _) => Some(true),
        (true, false) => Some(false),
        (true, true) => device.availability_topic.is_empty().then_some(true),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
