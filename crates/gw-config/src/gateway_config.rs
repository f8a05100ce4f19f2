//! Typed configuration sections

use crate::error::{ConfigError, ConfigResult};
use gw_core::is_valid_segment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "/etc/homed/homed-custom.yaml";

/// Broker connection and topic layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSection {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Root of every gateway topic
    pub prefix: String,
    /// Address devices by name instead of id in per-device topics
    pub names: bool,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "homed-custom".to_string(),
            username: None,
            password: None,
            prefix: "homed".to_string(),
            names: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub namespace: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            namespace: "custom".to_string(),
        }
    }
}

/// File locations for the catalog, properties and expose defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub database: PathBuf,
    pub properties: PathBuf,
    pub expose: PathBuf,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            database: PathBuf::from("/opt/homed-custom/database.json"),
            properties: PathBuf::from("/opt/homed-custom/properties.json"),
            expose: PathBuf::from("/usr/share/homed-common/expose.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantSection {
    pub enabled: bool,
    pub status: String,
}

impl Default for HomeAssistantSection {
    fn default() -> Self {
        Self {
            enabled: false,
            status: "homeassistant/status".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Default tracing directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mqtt: MqttSection,
    pub service: ServiceSection,
    pub device: DeviceSection,
    pub homeassistant: HomeAssistantSection,
    pub log: LogSection,
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content, path)?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, Path::new("<string>"))
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        // an empty document deserializes as null
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mqtt.host.trim().is_empty() {
            return Err(invalid("mqtt.host", "must not be empty"));
        }

        if self.mqtt.port == 0 {
            return Err(invalid("mqtt.port", "must not be zero"));
        }

        if self.mqtt.prefix.is_empty()
            || self.mqtt.prefix.split('/').any(|s| !is_valid_segment(s))
        {
            return Err(invalid("mqtt.prefix", "must be a topic without wildcards"));
        }

        if !is_valid_segment(&self.service.namespace) {
            return Err(invalid("service.namespace", "must be a single topic segment"));
        }

        if self.homeassistant.enabled && self.homeassistant.status.trim().is_empty() {
            return Err(invalid("homeassistant.status", "must not be empty"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
