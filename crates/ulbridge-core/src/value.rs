//! Values carried by UltraLight commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Render a JSON value as UL text: strings unquoted, everything else as JSON.
#[must_use]
pub fn wire_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The value part of a UL command: either a raw scalar or `key=value` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UlValue {
    /// Raw text, passed through untouched
    Scalar(String),
    /// Attribute pairs
    Map(BTreeMap<String, String>),
}

impl UlValue {
    /// Borrow the attribute map, if this is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Map(map) => Some(map),
            Self::Scalar(_) => None,
        }
    }

    /// Borrow the scalar text, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Map(_) => None,
        }
    }
}

impl From<&str> for UlValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<BTreeMap<String, String>> for UlValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}
