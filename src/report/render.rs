//! Event renderer
//!
//! Formats an event as a fixed sequence of labelled lines, bracketed by a
//! separator so reports stand out in a busy console.

use std::fmt;

use crate::protocol::Event;

/// Width of the `=` separator line
pub const SEPARATOR_WIDTH: usize = 78;

/// Column where values start
const LABEL_WIDTH: usize = 16;

/// Timestamp layout, always UTC
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A rendered event report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    /// All lines, separators included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

struct ReportBuilder {
    lines: Vec<String>,
}

impl ReportBuilder {
    fn new() -> Self {
        Self {
            lines: vec![separator()],
        }
    }

    fn field(&mut self, label: &str, value: impl fmt::Display) -> &mut Self {
        let label = format!("{}:", label);
        self.lines
            .push(format!("{:<width$}{}", label, value, width = LABEL_WIDTH));
        self
    }

    fn finish(mut self) -> Report {
        self.lines.push(separator());
        Report { lines: self.lines }
    }
}

fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Render an event into a report
pub fn render(event: &Event) -> Report {
    let mut report = ReportBuilder::new();

    report
        .field("imei", &event.device.imei)
        .field("serial_no", &event.device.serial_no)
        .field("message_type", &event.message_type)
        .field("timestamp", event.timestamp.format(TIMESTAMP_FORMAT))
        .field("gateway", &event.gateway)
        .field("code", &event.code)
        .field("message", &event.message)
        .field(
            "source",
            format_args!(
                "{}: {} [url: {}]",
                event.source.label, event.source.value, event.source.url
            ),
        );

    if let Some(location) = &event.location {
        report.field(
            "location",
            format_args!(
                "lat: {} lng: {} address: {}",
                location.latitude, location.longitude, location.address
            ),
        );
    }

    report
        .field("importance", &event.importance)
        .field("alert_level", event.alert_level)
        .field("color", &event.color)
        .field("state", &event.state)
        .field("ticket", if event.ticket { "True" } else { "False" })
        .field(
            "device",
            format_args!(
                "imei: {} serialno: {} [url: {}]",
                event.device.imei, event.device.serial_no, event.device.url
            ),
        );

    for field in &event.data {
        report.field(
            "data",
            format_args!("{}: {} [url: {}]", field.label, field.value, field.url),
        );
    }

    report.finish()
}
