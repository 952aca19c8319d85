//! # FIWARE Adapter
//!
//! Entity mapping and HTTP clients for the two REST services behind the bridge:
//!
//! - **IoT agent** (device registry): service groups and device provisioning
//!   under `/iot/services` and `/iot/devices`
//! - **Context broker**: current entity state under `/v2/entities`
//!
//! Every request carries the `fiware-service` and `fiware-servicepath`
//! headers. Devices live under the `/device` service path; the sensors of a
//! device live under `/device/{deviceId}`.
//!
//! The [`Registry`] and [`ContextBroker`] traits are the seams the agent
//! depends on; [`IotAgentClient`] and [`OrionClient`] implement them over HTTP.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod encoding;
pub mod entity;
pub mod iota;
pub mod mapping;
pub mod orion;
pub mod ports;

pub use client::{ClientError, FiwareClientConfig, Lookup};
pub use encoding::encode_path_segment;
pub use entity::{
    AttributeDecl, ContextEntity, DeviceEntity, EntityType, ServiceGroup, ServicePath,
    StaticAttribute,
};
pub use iota::IotAgentClient;
pub use mapping::MappingError;
pub use orion::OrionClient;
pub use ports::{ContextBroker, Registry};
