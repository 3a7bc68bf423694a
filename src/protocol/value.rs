//! Variant values carried by event data fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The value of a supplemental data field.
///
/// Gateways put whatever the device reported in here, so every JSON shape is
/// representable. Numbers keep their integer/float distinction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<DataValue>),
    Object(BTreeMap<String, DataValue>),
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => Ok(()),
            DataValue::Bool(true) => f.write_str("True"),
            DataValue::Bool(false) => f.write_str("False"),
            DataValue::Number(n) => write!(f, "{}", n),
            DataValue::String(s) => f.write_str(s),
            DataValue::Array(_) | DataValue::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Number(n.into())
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}
