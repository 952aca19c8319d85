//! Wire representations of registry and context broker resources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Service path holding device entities.
pub const DEVICE_SERVICE_PATH: &str = "/device";

/// Resource the UL service groups are attached to.
pub const UL_RESOURCE: &str = "/iot/d";

/// Entity type of a provisioned entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A device
    Device,
    /// A sensor of a device
    Sensor,
}

impl EntityType {
    /// Name used by the registry.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Sensor => "sensor",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `fiware-servicepath` header scoping a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServicePath(String);

impl ServicePath {
    /// Scope of all device entities.
    #[must_use]
    pub fn devices() -> Self {
        Self(DEVICE_SERVICE_PATH.to_string())
    }

    /// Scope of the sensors of one device.
    #[must_use]
    pub fn device(device_id: &str) -> Self {
        Self(format!("{DEVICE_SERVICE_PATH}/{device_id}"))
    }

    /// Header value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute or command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDecl {
    /// Name on the device side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Name on the entity side
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub kind: String,
}

impl AttributeDecl {
    /// Declare an attribute with the same name on both sides.
    #[must_use]
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            object_id: Some(name.to_string()),
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Declare a command.
    #[must_use]
    pub fn command(name: &str) -> Self {
        Self::new(name, "command")
    }
}

/// Provisioning namespace ("service group").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroup {
    /// Routing key devices of the group publish under
    pub apikey: String,
    /// Type of entities created in the group
    pub entity_type: EntityType,
    /// Southbound resource
    pub resource: String,
    /// Active attributes
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    /// Commands
    #[serde(default)]
    pub commands: Vec<AttributeDecl>,
}

/// Attribute with a fixed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAttribute {
    /// Attribute name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribute value
    pub value: Value,
}

/// A device or sensor as provisioned in the IoT agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntity {
    /// Identifier in the registry
    pub device_id: String,
    /// Identifier of the matching context entity
    pub entity_name: String,
    /// Entity type (`device` or `sensor`)
    pub entity_type: String,
    /// Southbound protocol
    #[serde(default)]
    pub protocol: String,
    /// Southbound transport
    #[serde(default)]
    pub transport: String,
    /// Static attributes
    #[serde(default)]
    pub static_attributes: Vec<StaticAttribute>,
}

impl DeviceEntity {
    /// Look up a static attribute by name.
    #[must_use]
    pub fn static_attribute(&self, name: &str) -> Option<&Value> {
        self.static_attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }
}

/// An entity of the context broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntity {
    /// Entity id
    pub id: String,
    /// Entity type
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining attributes
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}
