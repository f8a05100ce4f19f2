//! Debounced persistence of the catalog and live properties
//!
//! Two independent writers share one pattern: a request restarts a timer and
//! the write happens when the owner polls after the deadline.

use crate::device::DeviceRecord;
use crate::device_list::DeviceList;
use crate::storage::JsonFile;
use chrono::Utc;
use gw_core::{earliest, Debounce, SERVICE_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Coalescing window for catalog writes
pub const STORE_DATABASE_DELAY: Duration = Duration::from_millis(20);

/// Coalescing window for property snapshot writes
pub const STORE_PROPERTIES_DELAY: Duration = Duration::from_millis(1000);

/// Catalog document, also published as the service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub names: bool,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub version: String,
}

/// Stored catalog, read leniently record by record
#[derive(Debug, Default, Deserialize)]
struct StoredCatalog {
    #[serde(default)]
    devices: Vec<Value>,
}

/// Owner of the catalog and properties files
#[derive(Debug)]
pub struct Store {
    database: JsonFile,
    properties: JsonFile,
    database_timer: Debounce,
    properties_timer: Debounce,
    sync: bool,
}

impl Store {
    pub fn new(database: impl AsRef<Path>, properties: impl AsRef<Path>) -> Self {
        Self {
            database: JsonFile::new(database),
            properties: JsonFile::new(properties),
            database_timer: Debounce::new(STORE_DATABASE_DELAY),
            properties_timer: Debounce::new(STORE_PROPERTIES_DELAY),
            sync: false,
        }
    }

    /// Read both files into the catalog
    ///
    /// Missing files leave the catalog empty. An unreadable file is logged
    /// and skipped; the next flush replaces it. Returns the number of devices
    /// loaded.
    pub async fn load(&self, devices: &mut DeviceList) -> usize {
        let catalog: StoredCatalog = match self.database.load().await {
            Ok(catalog) => catalog.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read device catalog {:?}: {}", self.database.path(), e);
                StoredCatalog::default()
            }
        };
        let loaded = devices.restore_devices(&catalog.devices);

        match self.properties.load::<Map<String, Value>>().await {
            Ok(Some(properties)) => devices.restore_properties(&properties),
            Ok(None) => {}
            Err(e) => warn!("Failed to read device properties {:?}: {}", self.properties.path(), e),
        }

        info!("Loaded {} devices from {:?}", loaded, self.database.path());
        loaded
    }

    /// Request a catalog flush
    ///
    /// A durable write only happens for flushes where some request in the
    /// window asked for `sync`.
    pub fn store_database(&mut self, sync: bool, now: Instant) {
        self.sync |= sync;
        self.database_timer.restart(now);
    }

    /// Request a property snapshot flush
    pub fn store_properties(&mut self, now: Instant) {
        self.properties_timer.restart(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.database_timer.deadline(),
            self.properties_timer.deadline(),
        ])
    }

    pub fn is_pending(&self) -> bool {
        self.database_timer.is_active() || self.properties_timer.is_active()
    }

    /// Run the writers that are due
    ///
    /// Returns the status snapshot when the catalog writer fired.
    pub async fn poll(&mut self, now: Instant, devices: &DeviceList) -> Option<StatusSnapshot> {
        let status = if self.database_timer.fire(now) {
            Some(self.write_database(devices).await)
        } else {
            None
        };

        if self.properties_timer.fire(now) {
            self.write_properties(devices).await;
        }

        status
    }

    /// Write everything pending right away, durably
    pub async fn flush(&mut self, devices: &DeviceList) -> StatusSnapshot {
        self.sync = true;
        self.database_timer.cancel();
        self.properties_timer.cancel();

        self.write_properties(devices).await;
        self.write_database(devices).await
    }

    fn snapshot(devices: &DeviceList) -> StatusSnapshot {
        StatusSnapshot {
            devices: devices.serialize_devices(),
            names: devices.names(),
            timestamp: Utc::now().timestamp(),
            version: SERVICE_VERSION.to_string(),
        }
    }

    async fn write_database(&mut self, devices: &DeviceList) -> StatusSnapshot {
        let status = Self::snapshot(devices);

        if !std::mem::take(&mut self.sync) {
            return status;
        }

        match self.database.save(&status, true).await {
            Ok(()) => debug!("Catalog stored ({} devices)", status.devices.len()),
            Err(e) => warn!("Failed to store catalog {:?}: {}", self.database.path(), e),
        }

        status
    }

    async fn write_properties(&self, devices: &DeviceList) {
        let snapshot = devices.serialize_properties();

        match self.properties.save(&snapshot, false).await {
            Ok(()) => debug!("Properties stored ({} devices)", snapshot.len()),
            Err(e) => warn!("Failed to store properties {:?}: {}", self.properties.path(), e),
        }
    }
}
