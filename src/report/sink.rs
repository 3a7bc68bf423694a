//! Report sinks
//!
//! The dispatcher hands every finished report to a sink. The console sink
//! writes to stdout; logs go to stderr so the two streams never interleave.

use std::io::{self, Write};

use super::Report;

/// Destination for rendered reports
pub trait ReportSink: Send {
    /// Emit one complete report
    fn emit(&mut self, report: &Report) -> io::Result<()>;
}

/// Writes reports to any `io::Write`
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    emitted: u64,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, emitted: 0 }
    }

    /// Number of reports written so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ReportSink for WriterSink<W> {
    fn emit(&mut self, report: &Report) -> io::Result<()> {
        write!(self.writer, "{}", report)?;
        self.writer.flush()?;
        self.emitted += 1;
        Ok(())
    }
}
