//! # UL Bridge Core
//!
//! Domain model shared by every crate of the bridge.
//!
//! - [`Device`] and [`SensorSchema`]: what the bridge provisions in the registry
//! - [`UlValue`]: the value carried by an UltraLight command
//! - [`BridgeEvent`]: commands delivered from the cloud side to the device side

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod event;
pub mod value;

pub use device::{Device, DeviceRecord, SensorData, SensorSchema};
pub use event::{
    BridgeEvent, ConfigUpdated, ConfigValue, DataRequested, DataUpdated, PropertiesUpdated,
};
pub use value::{wire_text, UlValue};
