//! Translation between domain records and registry entities.

use crate::entity::{AttributeDecl, DeviceEntity, EntityType, StaticAttribute};
use serde_json::Value;
use ulbridge_core::{Device, SensorSchema};

/// Southbound protocol tag of every provisioned entity.
pub const PROTOCOL: &str = "IoTA-UL";

/// Southbound transport tag of every provisioned entity.
pub const TRANSPORT: &str = "MQTT";

/// Static attribute pointing a sensor back at its device.
pub const DEVICE_BACKREF: &str = "device";

/// Type name of a JSON value, as declared on registry attributes.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

fn static_attribute(name: &str, value: &Value) -> StaticAttribute {
    StaticAttribute {
        name: name.to_string(),
        kind: json_type_name(value).to_string(),
        value: value.clone(),
    }
}

/// Registry entity of a device.
#[must_use]
pub fn device_to_entity(device: &Device) -> DeviceEntity {
    DeviceEntity {
        device_id: device.id.clone(),
        entity_name: device.id.clone(),
        entity_type: EntityType::Device.as_str().to_string(),
        protocol: PROTOCOL.to_string(),
        transport: TRANSPORT.to_string(),
        static_attributes: vec![static_attribute("name", &Value::String(device.name.clone()))],
    }
}

/// Device described by a registry entity.
///
/// A missing or non-string `name` attribute yields an empty name.
#[must_use]
pub fn entity_to_device(entity: &DeviceEntity) -> Device {
    let name = entity
        .static_attribute("name")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Device::new(entity.device_id.clone(), name)
}

/// Registry entity of a sensor of `device_id`.
#[must_use]
pub fn sensor_to_entity(device_id: &str, schema: &SensorSchema) -> DeviceEntity {
    let id = schema.sensor_id.to_string();

    let mut static_attributes: Vec<StaticAttribute> = schema
        .fields()
        .map(|(name, value)| static_attribute(name, value))
        .collect();
    static_attributes.push(static_attribute(
        DEVICE_BACKREF,
        &Value::String(device_id.to_string()),
    ));

    DeviceEntity {
        device_id: id.clone(),
        entity_name: id,
        entity_type: EntityType::Sensor.as_str().to_string(),
        protocol: PROTOCOL.to_string(),
        transport: TRANSPORT.to_string(),
        static_attributes,
    }
}

/// Sensor schema described by a registry entity.
///
/// Only the recognized schema fields are read back; `extra` is always empty.
///
/// # Errors
///
/// Returns error if the entity id is not a sensor number.
pub fn entity_to_sensor_schema(entity: &DeviceEntity) -> Result<SensorSchema, MappingError> {
    let sensor_id = entity
        .device_id
        .parse()
        .map_err(|_| MappingError::InvalidSensorId(entity.device_id.clone()))?;

    let mut schema = SensorSchema::new(sensor_id);
    for attr in &entity.static_attributes {
        if ulbridge_core::device::RECOGNIZED_FIELDS.contains(&attr.name.as_str()) {
            schema.set(&attr.name, attr.value.clone());
        }
    }

    Ok(schema)
}

/// Attribute declaration for a device property update.
#[must_use]
pub fn property_attribute(name: &str, value: &Value) -> AttributeDecl {
    AttributeDecl::new(name, json_type_name(value))
}

/// Errors that can occur mapping entities back to records.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MappingError {
    /// Sensor entity id is not an integer
    #[error("invalid sensor id: {0:?}")]
    InvalidSensorId(String),
}
