//! UltraLight command codec.
//!
//! Grammar: `{entityId}@{command}|{value}`.
//!
//! Parsing never fails. A payload that does not follow the grammar comes
//! back as [`Command::Unknown`] with empty fields, and the router drops it.

use crate::topics::RoutingKey;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use ulbridge_core::UlValue;

/// Commands understood by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Write a sensor value
    SetData,
    /// Request a sensor reading
    GetData,
    /// Push sensor configuration
    SetConfig,
    /// Push device properties
    SetProperties,
    /// Anything else (including malformed payloads)
    Unknown(String),
}

impl Command {
    /// Map the wire name to a command.
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name {
            "setData" => Self::SetData,
            "getData" => Self::GetData,
            "setConfig" => Self::SetConfig,
            "setProperties" => Self::SetProperties,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Name of the command on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SetData => "setData",
            Self::GetData => "getData",
            Self::SetConfig => "setConfig",
            Self::SetProperties => "setProperties",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    /// Routing key of the topic (`default` or a device id)
    pub id: String,
    /// Device or sensor identifier from the payload
    pub entity_id: String,
    /// Command name
    pub command: Command,
    /// Command value
    pub value: UlValue,
}

/// Parse the value part of a command.
///
/// Text without `=` is a scalar. Otherwise the text is split on `|` and each
/// token on its first `=`; a token lacking `=` maps to an empty value.
#[must_use]
pub fn parse_value(raw: &str) -> UlValue {
    if !raw.contains('=') {
        return UlValue::Scalar(raw.to_string());
    }

    let map = raw
        .split('|')
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (token.to_string(), String::new()),
        })
        .collect::<BTreeMap<_, _>>();

    UlValue::Map(map)
}

/// Render a value in UL form.
#[must_use]
pub fn format_value(value: &UlValue) -> String {
    match value {
        UlValue::Scalar(raw) => raw.clone(),
        UlValue::Map(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("|"),
    }
}

/// Parse a message received on `topic`.
#[must_use]
pub fn parse_message(topic: &str, payload: &str) -> InboundMessage {
    let id = RoutingKey::from_topic(topic).as_str().to_string();

    let separators = payload
        .find('@')
        .zip(payload.find('|'))
        .filter(|(at, bar)| at < bar);

    let Some((at, bar)) = separators else {
        return InboundMessage {
            id,
            entity_id: String::new(),
            command: Command::Unknown(String::new()),
            value: UlValue::Scalar(String::new()),
        };
    };

    InboundMessage {
        id,
        entity_id: payload[..at].to_string(),
        command: Command::from_wire(&payload[at + 1..bar]),
        value: parse_value(&payload[bar + 1..]),
    }
}

/// Build a UL command payload.
#[must_use]
pub fn format_message(entity_id: &str, command: &Command, value: &UlValue) -> String {
    format!("{entity_id}@{command}|{}", format_value(value))
}
