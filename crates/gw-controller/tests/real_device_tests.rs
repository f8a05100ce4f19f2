//! Real devices bridged through bindings and availability topics

mod common;

use common::*;
use serde_json::json;

const STATE: &str = "shellies/plug/relay/0";
const SET: &str = "shellies/plug/relay/0/command";
const ONLINE: &str = "shellies/plug/online";

async fn gateway_with(definition: serde_json::Value) -> TestGateway {
    let mut gateway = TestGateway::new();
    gateway.add(definition);
    gateway.advance(250).await;
    gateway.clear();
    gateway
}

fn plug(bindings: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "plug",
        "real": true,
        "exposes": ["switch", "power"],
        "bindings": bindings
    })
}

// ==================== Inbound Bindings ====================

#[tokio::test]
async fn test_inbound_binding_publishes_after_settle() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"inTopic": STATE},
        "power": {"inTopic": "shellies/plug/relay/0/power", "inPattern": "{{ value * 1 }}"}
    })))
    .await;

    assert!(gateway.bus.is_subscribed(STATE));
    assert!(gateway.bus.is_subscribed("shellies/plug/relay/0/power"));

    gateway.send_raw(STATE, b"on");
    gateway.send_raw("shellies/plug/relay/0/power", b"41.5");
    assert_eq!(gateway.properties("plug"), json!({"status": "on", "power": 41.5}));
    assert!(gateway.bus.published_to(&fd_topic("plug")).is_empty());

    gateway.advance(100).await;
    assert_eq!(
        gateway.last_json(&fd_topic("plug")),
        Some(json!({"status": "on", "power": 41.5}))
    );

    // unchanged value does not restart the settle timer
    gateway.clear();
    gateway.send_raw(STATE, b"on");
    gateway.advance(100).await;
    assert!(gateway.bus.published_to(&fd_topic("plug")).is_empty());
}

#[tokio::test]
async fn test_inbound_pattern_extracts_json() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"inTopic": STATE, "inPattern": "{{ json.state }}"},
        "power": {"inTopic": STATE, "inPattern": "{{ json.meters.0.power }}"}
    })))
    .await;

    gateway.send_raw(STATE, br#"{"state": "off", "meters": [{"power": 3}]}"#);
    assert_eq!(gateway.properties("plug"), json!({"status": "off", "power": 3}));
}

#[tokio::test]
async fn test_inbound_null_removes_property() {
    let mut gateway = gateway_with(plug(json!({
        "power": {"inTopic": STATE, "inPattern": "{{ json.power if is defined else _NULL_ }}"}
    })))
    .await;

    gateway.send_raw(STATE, br#"{"power": 7}"#);
    assert_eq!(gateway.properties("plug"), json!({"power": 7}));

    gateway.send_raw(STATE, br#"{}"#);
    assert_eq!(gateway.properties("plug"), json!({}));
}

#[tokio::test]
async fn test_inactive_real_device_ignores_inbound() {
    let mut definition = plug(json!({"status": {"inTopic": STATE}}));
    definition["active"] = json!(false);
    let mut gateway = gateway_with(definition).await;

    gateway.send_raw(STATE, b"on");
    assert_eq!(gateway.properties("plug"), json!({}));
}

// ==================== Outbound Bindings ====================

#[tokio::test]
async fn test_outbound_binding_transforms_command() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"outTopic": SET, "outPattern": "{{ 'ON' if value == on else 'OFF' }}", "retain": true}
    })))
    .await;

    gateway.send(&td_topic("plug"), json!({"status": "on"}));

    let sent = gateway.bus.published_to(SET);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"ON");
    assert!(sent[0].retain);

    // outbound values never touch local properties
    assert_eq!(gateway.properties("plug"), json!({}));
    assert!(gateway.bus.published_to(&fd_topic("plug")).is_empty());
}

#[tokio::test]
async fn test_outbound_only_binding_ignores_inbound() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"outTopic": SET}
    })))
    .await;

    assert!(!gateway.bus.is_subscribed(SET));

    gateway.send_raw(SET, b"on");
    assert_eq!(gateway.properties("plug"), json!({}));
}

#[tokio::test]
async fn test_inbound_only_binding_never_publishes_out() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"inTopic": STATE}
    })))
    .await;

    gateway.send(&td_topic("plug"), json!({"status": "on"}));

    let foreign: Vec<_> = gateway
        .bus
        .published()
        .into_iter()
        .filter(|m| !m.topic.starts_with("homed/"))
        .collect();
    assert!(foreign.is_empty());

    // without an outbound binding the value is stored locally
    assert_eq!(gateway.properties("plug"), json!({"status": "on"}));
    gateway.advance(100).await;
    assert_eq!(gateway.last_json(&fd_topic("plug")), Some(json!({"status": "on"})));
}

#[tokio::test]
async fn test_real_toggle_uses_stored_state() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"inTopic": STATE, "outTopic": SET}
    })))
    .await;

    gateway.send_raw(STATE, b"on");
    gateway.send(&td_topic("plug"), json!({"status": "toggle"}));

    assert_eq!(gateway.bus.published_to(SET)[0].payload, b"off");
    assert_eq!(gateway.properties("plug")["status"], "on");
}

#[tokio::test]
async fn test_outbound_null_publishes_nothing() {
    let mut gateway = gateway_with(plug(json!({
        "status": {"outTopic": SET, "outPattern": "{{ 'ON' if value == on else _NULL_ }}"}
    })))
    .await;

    gateway.send(&td_topic("plug"), json!({"status": "off"}));
    assert!(gateway.bus.published_to(SET).is_empty());

    gateway.send(&td_topic("plug"), json!({"status": "on"}));
    assert_eq!(gateway.bus.published_to(SET).len(), 1);
}

// ==================== Availability ====================

#[tokio::test]
async fn test_availability_topic_drives_presence() {
    let mut definition = plug(json!({}));
    definition["availabilityTopic"] = json!(ONLINE);
    let mut gateway = TestGateway::new();
    gateway.add(definition);

    // presence waits for the availability topic
    assert!(gateway.bus.retained(&presence_topic("plug")).is_none());

    gateway.advance(250).await;
    assert!(gateway.bus.is_subscribed(ONLINE));

    gateway.send_raw(ONLINE, b"true");
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );

    gateway.send_raw(ONLINE, b"online");
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "online"}))
    );
}

#[tokio::test]
async fn test_availability_pattern() {
    let mut definition = plug(json!({}));
    definition["availabilityTopic"] = json!(ONLINE);
    definition["availabilityPattern"] = json!("{{ 'online' if json.connected == true else 'offline' }}");
    let mut gateway = gateway_with(definition).await;

    gateway.send_raw(ONLINE, br#"{"connected": true}"#);
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "online"}))
    );

    gateway.send_raw(ONLINE, br#"{"connected": false}"#);
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );
}

#[tokio::test]
async fn test_availability_change_forces_resubscribe() {
    let mut definition = plug(json!({}));
    definition["availabilityTopic"] = json!(ONLINE);
    let mut gateway = gateway_with(definition.clone()).await;
    assert!(gateway.bus.is_subscribed(ONLINE));

    definition["availabilityTopic"] = json!("shellies/plug/lwt");
    gateway.command("updateDevice", Some("plug"), Some(definition.clone()));
    gateway.advance(250).await;
    assert!(gateway.bus.is_subscribed("shellies/plug/lwt"));

    // switching back renews the old subscription
    definition["availabilityTopic"] = json!(ONLINE);
    gateway.command("updateDevice", Some("plug"), Some(definition));
    assert!(!gateway.bus.is_subscribed(ONLINE));
    gateway.advance(250).await;
    assert!(gateway.bus.is_subscribed(ONLINE));
}

#[tokio::test]
async fn test_real_device_without_availability_is_online() {
    let gateway = gateway_with(plug(json!({}))).await;
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "online"}))
    );
}

#[tokio::test]
async fn test_inactive_real_device_stays_offline() {
    let mut definition = plug(json!({}));
    definition["active"] = json!(false);
    definition["availabilityTopic"] = json!(ONLINE);
    let mut gateway = gateway_with(definition).await;

    assert!(!gateway.bus.is_subscribed(ONLINE));
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );

    gateway.send_raw(ONLINE, b"online");
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );

    gateway.controller.quit().await;
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );
}

#[tokio::test]
async fn test_deactivation_and_reactivation() {
    let mut definition = plug(json!({}));
    definition["availabilityTopic"] = json!(ONLINE);
    let mut gateway = gateway_with(definition.clone()).await;

    gateway.send_raw(ONLINE, b"online");
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "online"}))
    );

    definition["active"] = json!(false);
    gateway.command("updateDevice", Some("plug"), Some(definition.clone()));
    assert_eq!(
        gateway.retained_json(&presence_topic("plug")),
        Some(json!({"status": "offline"}))
    );

    // reactivation renews the subscription so the retained state replays
    definition["active"] = json!(true);
    gateway.command("updateDevice", Some("plug"), Some(definition));
    assert!(!gateway.bus.is_subscribed(ONLINE));
    gateway.advance(250).await;
    assert!(gateway.bus.is_subscribed(ONLINE));
}
