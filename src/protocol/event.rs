//! Event message definitions
//!
//! Full payload of a version 1 "event" message.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, DataValue};

/// A decoded event notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Message structure version
    #[serde(rename = "message_ver", default, deserialize_with = "nullable")]
    pub version: i64,
    /// Message type, always "event" for decoded events
    #[serde(rename = "message_type", default, deserialize_with = "nullable")]
    pub message_type: String,
    /// Whether the gateway validated the event
    #[serde(default, deserialize_with = "nullable")]
    pub valid: bool,
    /// When the event happened, normalized to UTC
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Domain which received the message from the unit
    #[serde(default, deserialize_with = "nullable")]
    pub gateway: String,
    /// Event code
    #[serde(default, deserialize_with = "nullable")]
    pub code: String,
    /// Event text
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    /// TCP/UDP port the unit connected to on the gateway
    #[serde(default, deserialize_with = "nullable")]
    pub port: u16,
    /// Transmission medium: tcp, udp, http, https, sms
    #[serde(default, deserialize_with = "nullable")]
    pub transmission: String,
    /// high, medium or low
    #[serde(default, deserialize_with = "nullable")]
    pub importance: String,
    /// Alert score, nominally 0 to 10
    #[serde(default, deserialize_with = "nullable")]
    pub alert_level: i32,
    /// HTML color, e.g. "#FF8000"
    #[serde(default, deserialize_with = "nullable")]
    pub color: String,
    /// "start"/"end" for stateful events, empty for standalone ones
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    /// Whether a ticket should be raised on a remote system
    #[serde(default, deserialize_with = "nullable")]
    pub ticket: bool,
    /// Origin of the event
    pub source: Source,
    /// Where the event happened, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Device that generated the event
    pub device: Device,
    /// Supplemental data fields, in payload order
    #[serde(default, deserialize_with = "nullable")]
    pub data: Vec<DataField>,
    /// Internal routing pools; carried, never rendered
    #[serde(default, deserialize_with = "nullable")]
    pub pools: Vec<String>,
}

/// The entity or process that raised an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Field name, e.g. "veh_reg"
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
    /// Label, e.g. "Vehicle"
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    /// The actual source, e.g. "ABC 123 GP"
    #[serde(default, deserialize_with = "nullable")]
    pub value: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// Geospatial context of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Decimal degrees, -90.0 to +90.0
    pub latitude: f64,
    /// Decimal degrees, -180.0 to +180.0
    pub longitude: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub address: String,
}

/// The unit that generated an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Either "imei" or "code"
    #[serde(default, deserialize_with = "nullable")]
    pub identifier: String,
    #[serde(default, deserialize_with = "nullable")]
    pub imei: String,
    #[serde(default, deserialize_with = "nullable")]
    pub serial_no: String,
    /// Firmware version, e.g. "1.04"
    #[serde(default, deserialize_with = "nullable")]
    pub firm_ver: String,
    /// Device type, e.g. "teltonika"
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub device_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub model: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

impl Device {
    /// The identifier the `identifier` tag points at
    pub fn primary_id(&self) -> &str {
        match self.identifier.as_str() {
            "code" => &self.serial_no,
            _ => &self.imei,
        }
    }
}

/// An open-ended supplemental attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default)]
    pub value: DataValue,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// Parse an ISO 8601 timestamp into UTC.
///
/// Offsets may be written `+hh:mm`, `+hhmm` or `+hh`. Timestamps without an
/// offset are taken to be UTC already.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let err = match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => return Ok(ts.with_timezone(&Utc)),
        Err(err) => err,
    };

    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| err)
}

mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_timestamp_is_normalized() {
        let ts = parse_timestamp("2019-03-04T12:30:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2019, 3, 4, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_compact_offsets_are_normalized() {
        let expected = Utc.with_ymd_and_hms(2019, 2, 5, 12, 22, 10).unwrap();

        assert_eq!(parse_timestamp("2019-02-05T14:22:10+0200").unwrap(), expected);
        assert_eq!(parse_timestamp("2019-02-05T14:22:10+02").unwrap(), expected);
        assert_eq!(parse_timestamp("2019-02-05T09:52:10.000-0230").unwrap(), expected);
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let ts = parse_timestamp("2019-03-04T12:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2019, 3, 4, 12, 30, 0).unwrap());

        let ts = parse_timestamp("2019-03-04T12:30:00.250").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_garbage_timestamp_fails() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_primary_id_follows_identifier() {
        let mut device = Device {
            identifier: "imei".to_string(),
            imei: "356307042441013".to_string(),
            serial_no: "SN-1".to_string(),
            ..Default::default()
        };
        assert_eq!(device.primary_id(), "356307042441013");

        device.identifier = "code".to_string();
        assert_eq!(device.primary_id(), "SN-1");
    }
}
