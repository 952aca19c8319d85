//! MQTT topic scheme of the UltraLight transport.
//!
//! Topic structure: `/{apikey}/{entityId}/{suffix}`
//!
//! Device-level commands travel under the `default` apikey; sensor-level
//! commands use the owning device id as apikey.

use serde::{Deserialize, Serialize};

/// Apikey of the device service group.
pub const DEFAULT_APIKEY: &str = "default";

/// Suffix appended to a command topic to form its acknowledgment topic.
pub const ACK_SUFFIX: &str = "exe";

/// Routing key found in the second segment of a command topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingKey {
    /// The `default` sentinel (device-level command)
    Default,
    /// A service group apikey (the owning device id)
    Apikey(String),
}

impl RoutingKey {
    /// Extract the routing key from a topic.
    ///
    /// A topic without a second segment yields an empty apikey.
    #[must_use]
    pub fn from_topic(topic: &str) -> Self {
        match topic.split('/').nth(1).unwrap_or_default() {
            DEFAULT_APIKEY => Self::Default,
            key => Self::Apikey(key.to_string()),
        }
    }

    /// The key as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => DEFAULT_APIKEY,
            Self::Apikey(key) => key,
        }
    }
}

/// Topic on which commands for `entity_id` are delivered.
#[must_use]
pub fn command(apikey: &str, entity_id: &str) -> String {
    format!("/{apikey}/{entity_id}/cmd")
}

/// Command topic of a device.
#[must_use]
pub fn device_command(device_id: &str) -> String {
    command(DEFAULT_APIKEY, device_id)
}

/// Command topic of a sensor.
#[must_use]
pub fn sensor_command(device_id: &str, sensor_id: u32) -> String {
    command(device_id, &sensor_id.to_string())
}

/// Acknowledgment topic for a command topic.
#[must_use]
pub fn ack(command_topic: &str) -> String {
    format!("{command_topic}{ACK_SUFFIX}")
}

/// Topic on which a sensor reading is published.
#[must_use]
pub fn telemetry(device_id: &str, sensor_id: u32) -> String {
    format!("/{device_id}/{sensor_id}/attrs/value")
}

/// Topic on which a device property is published.
#[must_use]
pub fn property(device_id: &str, name: &str) -> String {
    format!("/{DEFAULT_APIKEY}/{device_id}/attrs/{name}")
}
