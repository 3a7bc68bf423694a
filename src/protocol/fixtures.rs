//! Sample payloads shared by the unit tests

pub const SAMPLE_EVENT: &str = r##"{
    "message_ver": 1,
    "message_type": "event",
    "valid": true,
    "timestamp": "2019-02-05T14:22:10+02:00",
    "gateway": "gw1.example.com",
    "code": "PANIC",
    "message": "Panic button pressed",
    "port": 5027,
    "transmission": "tcp",
    "importance": "high",
    "alert_level": 8,
    "color": "#FF0000",
    "state": "",
    "ticket": true,
    "source": { "key": "veh_reg", "label": "Vehicle", "value": "ABC 123 GP", "url": "https://fleet.example.com/v/1" },
    "device": {
        "identifier": "imei", "imei": "356307042441013", "serial_no": "",
        "firm_ver": "1.04", "type": "teltonika", "model": "FMB920", "url": "https://fleet.example.com/d/1"
    },
    "data": [
        { "key": "speed", "label": "Speed", "value": 87, "url": "" },
        { "key": "ignition", "label": "Ignition", "value": true, "url": "" }
    ],
    "pools": ["ops", "billing"],
    "unexpected": { "ignored": true }
}"##;
