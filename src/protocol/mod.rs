//! Protocol module - Defines the JSON wire format for universal event messages
//!
//! Every message on the queue starts with the same three envelope fields:
//! - `message_ver`: structure version
//! - `message_type`: "register", "gps", "history", "status", "event", "heartbeat"
//! - `valid`: whether the gateway validated the message
//!
//! Only version 1 "event" messages that the gateway marked valid are decoded in full.

mod codec;
mod envelope;
mod event;
mod value;

#[cfg(test)]
pub(crate) mod fixtures;

pub use codec::*;
pub use envelope::*;
pub use event::*;
pub use value::*;

use serde::{Deserialize, Deserializer};

/// The only message structure version this receiver understands
pub const SUPPORTED_MESSAGE_VERSION: i64 = 1;

/// Message type carried by event notifications
pub const EVENT_MESSAGE_TYPE: &str = "event";

/// Reads a JSON `null` as the type's zero value.
///
/// Gateways emit `null` for unset strings, which the receiver treats the same
/// as an absent field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
