//! Events raised when the cloud side addresses a device.

use crate::value::UlValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `setConfig` entry after integer coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Value that parsed as an integer
    Integer(i64),
    /// Anything else, kept verbatim
    Text(String),
}

impl ConfigValue {
    /// Coerce a raw attribute value.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Text(raw.to_string()), Self::Integer)
    }
}

/// Sensor configuration pushed to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdated {
    /// Routing key of the command
    pub id: String,
    /// Coerced configuration mappings
    pub config: Vec<BTreeMap<String, ConfigValue>>,
}

/// Device properties pushed to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesUpdated {
    /// Routing key of the command
    pub id: String,
    /// New properties, as received
    pub properties: UlValue,
}

/// Request for a fresh reading of a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequested {
    /// Routing key of the command
    pub id: String,
    /// Sensor to read
    pub sensor_id: u32,
}

/// New value to write to a sensor (actuator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUpdated {
    /// Routing key of the command
    pub id: String,
    /// Sensor to write
    pub sensor_id: u32,
    /// Value to write
    pub data: UlValue,
}

/// Any event raised by the command router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// See [`ConfigUpdated`]
    ConfigUpdated(ConfigUpdated),
    /// See [`PropertiesUpdated`]
    PropertiesUpdated(PropertiesUpdated),
    /// See [`DataRequested`]
    DataRequested(DataRequested),
    /// See [`DataUpdated`]
    DataUpdated(DataUpdated),
}
