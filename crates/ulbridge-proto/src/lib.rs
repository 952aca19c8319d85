//! # UL Bridge Protocol
//!
//! UltraLight wire codec and MQTT topic scheme.
//!
//! ## Payloads
//!
//! `{entityId}@{command}|{value}` where `{value}` is either a raw scalar or
//! `k1=v1|k2=v2|...`. There is no escaping: keys and values must not contain
//! `|` or `=`.
//!
//! ## MQTT Topics
//!
//! - Commands: `/{apikey}/{entityId}/cmd`, acknowledged on `/{apikey}/{entityId}/cmdexe`
//! - Telemetry: `/{deviceId}/{sensorId}/attrs/value`
//! - Properties: `/default/{deviceId}/attrs/{property}`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod topics;
pub mod ul;

pub use topics::{RoutingKey, DEFAULT_APIKEY};
pub use ul::{format_message, format_value, parse_message, parse_value, Command, InboundMessage};
