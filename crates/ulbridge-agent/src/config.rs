//! Bridge configuration.

use crate::transport::MqttConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use ulbridge_adapter_fiware::FiwareClientConfig;
use ulbridge_core::Device;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MQTT broker connection
    pub mqtt: MqttConfig,

    /// IoT agent (device registry)
    pub iota: FiwareClientConfig,

    /// Context broker
    pub orion: FiwareClientConfig,

    /// Devices to register at startup
    pub devices: Vec<Device>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            iota: FiwareClientConfig::default(),
            orion: FiwareClientConfig {
                base_url: "http://localhost:1026".to_string(),
                ..FiwareClientConfig::default()
            },
            devices: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ULBRIDGE_MQTT_BROKER`: MQTT broker URL
    /// - `ULBRIDGE_CLIENT_ID`: MQTT client identifier
    /// - `ULBRIDGE_IOTA_URL`: IoT agent base URL
    /// - `ULBRIDGE_ORION_URL`: Context broker base URL
    /// - `ULBRIDGE_FIWARE_SERVICE`: `fiware-service` header value
    /// - `ULBRIDGE_HTTP_TIMEOUT_SECS`: HTTP request timeout
    /// - `ULBRIDGE_CONNECT_TIMEOUT_SECS`: MQTT handshake timeout
    /// - `ULBRIDGE_DEVICES`: JSON list of `{"id", "name"}` devices
    ///
    /// # Errors
    ///
    /// Returns error if a numeric or JSON variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(broker) = std::env::var("ULBRIDGE_MQTT_BROKER") {
            config.mqtt.broker = broker;
        }

        if let Ok(client_id) = std::env::var("ULBRIDGE_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }

        if let Ok(url) = std::env::var("ULBRIDGE_IOTA_URL") {
            config.iota.base_url = url;
        }

        if let Ok(url) = std::env::var("ULBRIDGE_ORION_URL") {
            config.orion.base_url = url;
        }

        if let Ok(service) = std::env::var("ULBRIDGE_FIWARE_SERVICE") {
            config.iota.service.clone_from(&service);
            config.orion.service = service;
        }

        if let Ok(secs) = std::env::var("ULBRIDGE_HTTP_TIMEOUT_SECS") {
            let timeout = Duration::from_secs(
                secs.parse()
                    .context("Invalid ULBRIDGE_HTTP_TIMEOUT_SECS")?,
            );
            config.iota.timeout = timeout;
            config.orion.timeout = timeout;
        }

        if let Ok(secs) = std::env::var("ULBRIDGE_CONNECT_TIMEOUT_SECS") {
            config.mqtt.connect_timeout = Duration::from_secs(
                secs.parse()
                    .context("Invalid ULBRIDGE_CONNECT_TIMEOUT_SECS")?,
            );
        }

        if let Ok(devices_json) = std::env::var("ULBRIDGE_DEVICES") {
            config.devices =
                serde_json::from_str(&devices_json).context("Invalid ULBRIDGE_DEVICES JSON")?;
        }

        Ok(config)
    }
}
