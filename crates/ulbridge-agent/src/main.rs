//! Bridge daemon: registers the configured devices and logs every command
//! event until interrupted.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use ulbridge_agent::{Bridge, BridgeConfig, ChannelHandler};
use ulbridge_core::BridgeEvent;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting UL bridge");

    let config = BridgeConfig::from_env()?;
    let devices = config.devices.clone();

    let (handler, mut events) = ChannelHandler::new();
    let mut bridge = Bridge::new(config, handler).context("Failed to build bridge")?;
    bridge.start().await.context("Failed to start bridge")?;

    for device in &devices {
        if let Err(err) = bridge.add_device(device).await {
            tracing::error!(device_id = %device.id, error = %err, "Failed to register device");
        }
    }

    loop {
        tokio::select! {
            Some(event) = events.recv() => log_event(&event),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    bridge.stop().await?;
    Ok(())
}

fn log_event(event: &BridgeEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::info!(event = %json, "Command event"),
        Err(err) => tracing::warn!(error = %err, "Unserializable event"),
    }
}
