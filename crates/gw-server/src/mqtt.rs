//! Broker adapter
//!
//! The controller's publish and subscribe calls never block: they go onto an
//! unbounded request queue. A pump task hands them to the `AsyncClient`,
//! waiting whenever the client's own queue is full, and a driver task polls
//! the event loop and forwards connection changes and incoming publishes to
//! the controller channel.
//!
//! Dropping the transport ends the request queue; the pump then asks the
//! client to disconnect, and the driver stops once the disconnect has been
//! written, after everything queued before it.

use gw_bus::{BusEvent, Transport};
use gw_config::MqttSection;
use gw_core::Message;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const KEEP_ALIVE: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    Publish(Message),
    Subscribe(String),
    Unsubscribe(String),
}

pub struct MqttTransport {
    requests: mpsc::UnboundedSender<Request>,
}

/// Background tasks of one broker connection
pub struct MqttSession {
    pump: JoinHandle<()>,
    driver: JoinHandle<()>,
}

impl MqttTransport {
    /// Create the client and start the pump and driver tasks
    ///
    /// The returned receiver yields [`BusEvent::Connected`] on every
    /// (re)connection.
    pub fn connect(config: &MqttSection) -> (Self, mpsc::UnboundedReceiver<BusEvent>, MqttSession) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.as_deref().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (requests, queue) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::unbounded_channel();

        info!("Connecting to broker {}:{}", config.host, config.port);
        let session = MqttSession {
            pump: tokio::spawn(pump(client, queue)),
            driver: tokio::spawn(drive(event_loop, tx)),
        };

        (Self { requests }, rx, session)
    }

    fn send(&self, request: Request) {
        if let Err(e) = self.requests.send(request) {
            warn!("Broker connection closed, dropping {:?}", e.0);
        }
    }
}

impl Transport for MqttTransport {
    fn publish(&self, message: Message) {
        self.send(Request::Publish(message));
    }

    fn subscribe(&self, filter: &str) {
        self.send(Request::Subscribe(filter.to_string()));
    }

    fn unsubscribe(&self, filter: &str) {
        self.send(Request::Unsubscribe(filter.to_string()));
    }
}

impl MqttSession {
    /// Wait until everything queued has been written and the client has
    /// disconnected
    ///
    /// The transport must be dropped first, or the request queue never ends.
    /// Gives up after `limit`, e.g. when the broker is unreachable.
    pub async fn close(self, limit: Duration) {
        let Self { pump, driver } = self;

        let finished = tokio::time::timeout(limit, async {
            let _ = pump.await;
            let _ = driver.await;
        })
        .await;

        match finished {
            Ok(()) => debug!("Broker session closed"),
            Err(_) => warn!("Timed out after {:?} flushing broker requests", limit),
        }
    }
}

/// Hand queued requests to the client in order, then disconnect
async fn pump(client: AsyncClient, mut queue: mpsc::UnboundedReceiver<Request>) {
    while let Some(request) = queue.recv().await {
        let result = match request {
            Request::Publish(message) => {
                client
                    .publish(message.topic, QoS::AtMostOnce, message.retain, message.payload)
                    .await
            }
            Request::Subscribe(filter) => client.subscribe(filter, QoS::AtLeastOnce).await,
            Request::Unsubscribe(filter) => client.unsubscribe(filter).await,
        };

        if let Err(e) = result {
            warn!("Broker client stopped: {}", e);
            return;
        }
    }

    debug!("Request queue closed, disconnecting");
    if let Err(e) = client.disconnect().await {
        warn!("Failed to queue disconnect: {}", e);
    }
}

/// Poll the event loop until the disconnect request has been written
async fn drive(mut event_loop: EventLoop, tx: mpsc::UnboundedSender<BusEvent>) {
    let mut connected = false;

    loop {
        let event = match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnected from broker");
                return;
            }
            Ok(event) => translate(event),
            Err(e) => {
                if connected {
                    connected = false;
                    forward(&tx, BusEvent::Disconnected);
                }

                warn!("Broker connection error: {}, retrying in {:?}", e, RECONNECT_DELAY);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        let Some(event) = event else {
            continue;
        };

        match event {
            BusEvent::Connected => connected = true,
            BusEvent::Disconnected => connected = false,
            BusEvent::Message(_) => {}
        }

        forward(&tx, event);
    }
}

/// Pass an event to the controller
///
/// During shutdown the controller is gone; polling continues so queued
/// requests still reach the broker.
fn forward(tx: &mpsc::UnboundedSender<BusEvent>, event: BusEvent) {
    if tx.send(event).is_err() {
        trace!("Controller gone, dropping bus event");
    }
}

fn translate(event: Event) -> Option<BusEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => Some(BusEvent::Connected),
        Event::Incoming(Packet::Publish(publish)) => Some(BusEvent::Message(Message {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
            retain: publish.retain,
        })),
        Event::Incoming(Packet::Disconnect) => Some(BusEvent::Disconnected),
        _ => None,
    }
}
