//! End-to-end catalog persistence

use gw_registry::{DeviceList, ExposeKind, ExposeOptions, Store, STORE_DATABASE_DELAY};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::time::Instant;

fn store(dir: &TempDir) -> Store {
    Store::new(
        dir.path().join("database.json"),
        dir.path().join("properties.json"),
    )
}

// ==================== Catalog File ====================

#[tokio::test]
async fn test_catalog_document_shape() {
    let dir = TempDir::new().unwrap();
    let mut store = store(&dir);
    let mut devices = DeviceList::new(ExposeOptions::builtin(), true);

    let lamp = devices
        .parse(&json!({"id": "lamp", "name": "Desk Lamp", "note": "", "exposes": ["light"]}))
        .unwrap();
    devices.append(lamp);

    let now = Instant::now();
    store.store_database(true, now);
    let status = store.poll(now + STORE_DATABASE_DELAY, &devices).await.unwrap();
    assert!(status.names);

    let content = std::fs::read_to_string(dir.path().join("database.json")).unwrap();
    let document: Value = serde_json::from_str(&content).unwrap();

    assert_eq!(document["names"], true);
    assert!(document["timestamp"].as_i64().unwrap() > 0);
    assert!(document["version"].is_string());

    let record = &document["devices"][0];
    assert_eq!(record["id"], "lamp");
    assert_eq!(record["name"], "Desk Lamp");
    assert_eq!(record["exposes"], json!(["light"]));
    assert_eq!(record["active"], true);
    assert!(record.get("note").is_none());
    assert!(record.get("bindings").is_none());
}

#[tokio::test]
async fn test_catalog_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let mut store = store(&dir);
        let mut devices = DeviceList::new(ExposeOptions::builtin(), false);
        devices.restore_devices(&[
            json!({
                "id": "relay",
                "real": true,
                "exposes": ["switch_1", "switch_2"],
                "bindings": {
                    "status_1": {"inTopic": "relay/1", "outTopic": "relay/1/set"},
                    "status_2": {"inTopic": "relay/2", "outTopic": "relay/2/set"}
                }
            }),
            json!({"id": "climate", "active": false, "exposes": ["temperature", "thermostat"]}),
        ]);

        devices.get_mut(0).unwrap().set_property("status_1", json!("on"));
        store.flush(&devices).await;
    }

    let store = store(&dir);
    let mut devices = DeviceList::new(ExposeOptions::builtin(), false);
    assert_eq!(store.load(&mut devices).await, 2);

    let relay = devices.get(0).unwrap();
    assert_eq!(relay.endpoint.bindings.len(), 2);
    assert_eq!(relay.endpoint.exposes[0].kind, ExposeKind::Switch);
    assert_eq!(relay.properties()["status_1"], "on");
    assert_eq!(relay.subscriptions(), vec!["relay/1", "relay/2"]);

    let climate = devices.get(1).unwrap();
    assert!(!climate.active);
    assert_eq!(climate.endpoint.exposes[1].kind, ExposeKind::Thermostat);
    assert!(climate.properties().is_empty());
}

// ==================== Corrupt Files ====================

#[tokio::test]
async fn test_corrupt_catalog_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("database.json"), b"{\"devices\": [").unwrap();

    let store = store(&dir);
    let mut devices = DeviceList::new(ExposeOptions::builtin(), false);
    assert_eq!(store.load(&mut devices).await, 0);
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_empty_properties_file_keeps_catalog() {
    let dir = TempDir::new().unwrap();
    let catalog = json!({"devices": [{"id": "plug", "exposes": ["switch"]}]});
    std::fs::write(dir.path().join("database.json"), catalog.to_string()).unwrap();
    std::fs::write(dir.path().join("properties.json"), b"").unwrap();

    let store = store(&dir);
    let mut devices = DeviceList::new(ExposeOptions::builtin(), false);
    assert_eq!(store.load(&mut devices).await, 1);
    assert!(devices.get(0).unwrap().properties().is_empty());
}
