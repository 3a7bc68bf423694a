//! Generic message envelope
//!
//! The envelope is the minimal record shared by every message type. It is
//! sniffed first to decide whether the full event decode is worth running.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{nullable, EVENT_MESSAGE_TYPE, SUPPORTED_MESSAGE_VERSION};

/// Minimal generic record present on every message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message structure version
    #[serde(rename = "message_ver", default, deserialize_with = "nullable")]
    pub version: i64,
    /// Message type, e.g. "event" or "gps"
    #[serde(rename = "message_type", default, deserialize_with = "nullable")]
    pub message_type: String,
    /// Whether the gateway validated the message
    #[serde(default, deserialize_with = "nullable")]
    pub valid: bool,
}

/// Why a well-formed envelope was not accepted for event decoding.
///
/// Not an error: the message is recognized as something this receiver does
/// not handle and is still acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// Message type other than "event"
    MessageType(String),
    /// Event with an unsupported structure version
    Version(i64),
    /// Event the gateway flagged as invalid
    NotValid,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::MessageType(message_type) => {
                write!(f, "message type '{}' is not an event", message_type)
            }
            SchemaMismatch::Version(version) => write!(
                f,
                "message version {} is not supported (expected {})",
                version, SUPPORTED_MESSAGE_VERSION
            ),
            SchemaMismatch::NotValid => write!(f, "event was not validated by the gateway"),
        }
    }
}

impl Envelope {
    /// Evaluate the acceptance predicate
    pub fn check(&self) -> Result<(), SchemaMismatch> {
        if self.message_type != EVENT_MESSAGE_TYPE {
            return Err(SchemaMismatch::MessageType(self.message_type.clone()));
        }
        if self.version != SUPPORTED_MESSAGE_VERSION {
            return Err(SchemaMismatch::Version(self.version));
        }
        if !self.valid {
            return Err(SchemaMismatch::NotValid);
        }
        Ok(())
    }
}
