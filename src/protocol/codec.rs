//! Protocol codec for decoding queue messages
//!
//! Decoding happens in two stages over the same bytes: a cheap envelope
//! sniff, then the full event decode once the envelope has been accepted.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Envelope, Event};

/// Decode errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Malformed event: {0}")]
    Event(#[source] serde_json::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Deserialize a record that must be a JSON object.
///
/// Derived struct impls also accept JSON arrays positionally; messages are
/// only ever objects, so anything else is rejected up front.
fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    let record: Map<String, Value> = serde_json::from_slice(bytes)?;
    serde_json::from_value(Value::Object(record))
}

/// Parse the generic envelope from raw message bytes.
///
/// Missing fields take their zero value; only bytes that are not a JSON
/// object fail.
pub fn decode_envelope(bytes: &[u8]) -> DecodeResult<Envelope> {
    decode_record(bytes).map_err(DecodeError::Envelope)
}

/// Parse the full event from raw message bytes.
///
/// Callers must have accepted the envelope first. Unknown fields are ignored.
pub fn decode_event(bytes: &[u8]) -> DecodeResult<Event> {
    decode_record(bytes).map_err(DecodeError::Event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::fixtures::SAMPLE_EVENT;
    use crate::protocol::{DataField, DataValue, Device, Location, Source};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_envelope_missing_fields_default() {
        let envelope = decode_envelope(br#"{"message_type": "gps"}"#).unwrap();
        assert_eq!(envelope.version, 0);
        assert_eq!(envelope.message_type, "gps");
        assert!(!envelope.valid);
    }

    #[test]
    fn test_envelope_ignores_event_fields() {
        let envelope = decode_envelope(SAMPLE_EVENT.as_bytes()).unwrap();
        assert!(envelope.check().is_ok());
    }

    #[test]
    fn test_envelope_rejects_arrays() {
        for body in [&b"[]"[..], br#"[1]"#, br#"[1, "event", true]"#] {
            let err = decode_envelope(body).unwrap_err();
            assert!(matches!(err, DecodeError::Envelope(_)));
        }
    }

    #[test]
    fn test_envelope_rejects_scalars() {
        assert!(decode_envelope(b"42").is_err());
        assert!(decode_envelope(b"\"event\"").is_err());
        assert!(decode_envelope(b"null").is_err());
    }

    #[test]
    fn test_envelope_rejects_non_json() {
        let err = decode_envelope(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn test_envelope_rejects_wrong_scalar_type() {
        assert!(decode_envelope(br#"{"message_ver": "one"}"#).is_err());
    }

    #[test]
    fn test_decode_full_event() {
        let event = decode_event(SAMPLE_EVENT.as_bytes()).unwrap();

        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2019, 2, 5, 12, 22, 10).unwrap());
        assert_eq!(event.port, 5027);
        assert_eq!(event.alert_level, 8);
        assert_eq!(event.source.label, "Vehicle");
        assert_eq!(event.device.device_type, "teltonika");
        assert!(event.location.is_none());
        assert_eq!(event.data.len(), 2);
        assert_eq!(event.data[0].value, DataValue::from(87));
        assert_eq!(event.pools, vec!["ops", "billing"]);
    }

    #[test]
    fn test_null_location_is_absent() {
        let json = SAMPLE_EVENT.replace("\"pools\"", "\"location\": null, \"pools\"");
        let event = decode_event(json.as_bytes()).unwrap();
        assert!(event.location.is_none());
    }

    #[test]
    fn test_partial_location_fails() {
        let json = SAMPLE_EVENT.replace("\"pools\"", "\"location\": {\"latitude\": -26.1}, \"pools\"");
        let err = decode_event(json.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Event(_)));
    }

    #[test]
    fn test_malformed_nested_object_fails() {
        let json = SAMPLE_EVENT.replace("\"source\": {", "\"source\": [ {").replace(
            "\"https://fleet.example.com/v/1\" }",
            "\"https://fleet.example.com/v/1\" } ]",
        );
        assert!(decode_event(json.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_device_fails() {
        assert!(decode_event(br#"{"message_ver": 1, "message_type": "event", "valid": true}"#).is_err());
    }

    #[test]
    fn test_null_strings_read_as_empty() {
        let json = SAMPLE_EVENT.replace("\"state\": \"\"", "\"state\": null");
        let event = decode_event(json.as_bytes()).unwrap();
        assert_eq!(event.state, "");
    }

    #[test]
    fn test_event_roundtrip() {
        let original = Event {
            version: 1,
            message_type: "event".to_string(),
            valid: true,
            timestamp: Utc.with_ymd_and_hms(2020, 6, 1, 8, 0, 0).unwrap(),
            gateway: "gw".to_string(),
            code: "GEOFENCE_IN".to_string(),
            message: "Entered depot".to_string(),
            port: 5027,
            transmission: "udp".to_string(),
            importance: "low".to_string(),
            alert_level: 2,
            color: "#00FF00".to_string(),
            state: "start".to_string(),
            ticket: false,
            source: Source {
                key: "veh_reg".to_string(),
                label: "Vehicle".to_string(),
                value: "XYZ 789 GP".to_string(),
                url: String::new(),
            },
            location: Some(Location {
                latitude: -26.25,
                longitude: 28.5,
                address: "Johannesburg".to_string(),
            }),
            device: Device {
                identifier: "code".to_string(),
                serial_no: "SN-42".to_string(),
                ..Default::default()
            },
            data: vec![DataField {
                key: "zone".to_string(),
                label: "Zone".to_string(),
                value: DataValue::from("depot"),
                url: String::new(),
            }],
            pools: vec!["ops".to_string()],
        };

        let bytes = serde_json::to_vec(&original).unwrap();
        assert_eq!(decode_event(&bytes).unwrap(), original);

        let without_location = Event { location: None, ..original };
        let bytes = serde_json::to_vec(&without_location).unwrap();
        assert_eq!(decode_event(&bytes).unwrap().location, None);
    }
}
