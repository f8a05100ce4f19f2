//! Custom device gateway
//!
//! Loads the configuration, restores the catalog and runs the controller
//! against an MQTT broker until Ctrl-C or a restart request.

mod mqtt;

use anyhow::{Context, Result};
use clap::Parser;
use gw_config::{GatewayConfig, DEFAULT_CONFIG_PATH};
use gw_controller::{Controller, ControllerSettings, Exit};
use gw_registry::{DeviceList, ExposeOptions, Store};
use mqtt::MqttTransport;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit status asking the service manager to start us again
const RESTART_EXIT_CODE: u8 = 1;

/// Upper bound for delivering the final publishes on shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Custom device gateway
#[derive(Parser, Debug)]
#[command(name = "custom-gateway")]
#[command(version, about = "Virtual and MQTT-bridged devices on the homed bus", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = GatewayConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting custom gateway v{}", gw_core::SERVICE_VERSION);

    let expose_options = ExposeOptions::load(&config.device.expose);
    let devices = DeviceList::new(expose_options, config.mqtt.names);
    let store = Store::new(&config.device.database, &config.device.properties);

    let settings = ControllerSettings {
        prefix: config.mqtt.prefix.clone(),
        namespace: config.service.namespace.clone(),
        hub_status: config
            .homeassistant
            .enabled
            .then(|| config.homeassistant.status.clone()),
    };

    let (transport, events, session) = MqttTransport::connect(&config.mqtt);
    let mut controller = Controller::new(transport, settings, devices, store);

    controller.load().await;

    let exit = controller
        .run(events, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Interrupted");
        })
        .await;

    // ends the request queue so the session can flush and disconnect
    drop(controller);
    session.close(SHUTDOWN_TIMEOUT).await;

    match exit {
        Exit::Quit => {
            info!("Stopped");
            Ok(ExitCode::SUCCESS)
        }
        Exit::Restart => {
            info!("Restart requested");
            Ok(ExitCode::from(RESTART_EXIT_CODE))
        }
    }
}
