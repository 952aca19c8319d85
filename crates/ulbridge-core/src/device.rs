//! Devices and the sensors they expose.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema fields the registry mapping understands, in declaration order.
pub const RECOGNIZED_FIELDS: [&str; 4] = ["value_type", "unit", "type_id", "name"];

/// A field device known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Caller-assigned, globally unique identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl Device {
    /// Create a new device.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Description of one sensor of a device.
///
/// The four recognized fields survive a trip through the registry. Anything
/// else lands in `extra`, is provisioned as a static attribute, and is not
/// read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSchema {
    /// Sensor identifier, unique within its device
    pub sensor_id: u32,
    /// Type of the values produced by the sensor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Value>,
    /// Measurement unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Value>,
    /// Sensor type identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<Value>,
    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SensorSchema {
    /// Create a schema with only a sensor id.
    #[must_use]
    pub fn new(sensor_id: u32) -> Self {
        Self {
            sensor_id,
            ..Self::default()
        }
    }

    /// Set a field by name, routing unknown names to `extra`.
    pub fn set(&mut self, key: &str, value: Value) {
        match key {
            "value_type" => self.value_type = Some(value),
            "unit" => self.unit = Some(value),
            "type_id" => self.type_id = Some(value),
            "name" => self.name = Some(value),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    /// Builder variant of [`SensorSchema::set`].
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Every present field except `sensor_id`: recognized ones first, then extras.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        let recognized = [
            ("value_type", self.value_type.as_ref()),
            ("unit", self.unit.as_ref()),
            ("type_id", self.type_id.as_ref()),
            ("name", self.name.as_ref()),
        ];

        recognized
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

/// A single telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    /// Sensor producing the value
    pub sensor_id: u32,
    /// Sampled value
    pub value: Value,
}

impl SensorData {
    /// Render the value the way it travels on the wire.
    #[must_use]
    pub fn wire_value(&self) -> String {
        crate::value::wire_text(&self.value)
    }
}

/// A device as listed back from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Sensors registered for the device
    pub schema: Vec<SensorSchema>,
}
