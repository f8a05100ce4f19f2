//! YAML configuration loading for the custom device gateway
//!
//! Every key has a default, so an empty file (or an empty section) yields a
//! working configuration.
//!
//! # Example
//!
//! ```ignore
//! use gw_config::GatewayConfig;
//!
//! let config = GatewayConfig::load("/etc/homed/homed-custom.yaml")?;
//! println!("{}/command/{}", config.mqtt.prefix, config.service.namespace);
//! ```

mod error;
mod gateway_config;

pub use error::{ConfigError, ConfigResult};
pub use gateway_config::{
    DeviceSection, GatewayConfig, HomeAssistantSection, LogSection, MqttSection, ServiceSection,
    DEFAULT_CONFIG_PATH,
};
