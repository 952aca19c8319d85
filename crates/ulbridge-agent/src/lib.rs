//! # UL Bridge Agent
//!
//! Runtime bridging UltraLight 2.0 devices on MQTT to a FIWARE IoT agent and
//! context broker.
//!
//! ## Architecture
//!
//! - **Transport**: one MQTT connection; the event loop is polled on its own
//!   task and inbound publishes are forwarded in arrival order
//! - **Routing**: a single task parses each command, publishes its
//!   acknowledgment, then notifies the [`CommandHandler`]
//! - **Directory**: device and sensor lifecycle against the registry and
//!   context broker, with concurrent fan-out and aggregated failures
//! - **Provisioning**: idempotent service groups per service path

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod directory;
pub mod provisioning;
pub mod router;
pub mod transport;

#[cfg(test)]
mod fakes;

pub use bridge::{Bridge, BridgeError};
pub use config::BridgeConfig;
pub use directory::{DeviceDirectory, DirectoryError};
pub use provisioning::ProvisioningService;
pub use router::{ChannelHandler, CommandHandler, CommandRouter, NoopHandler};
pub use transport::{IncomingMessage, MqttConfig, MqttTransport, Transport, TransportError};
