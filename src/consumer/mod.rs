//! Consumer module - The per-message dispatch loop
//!
//! Each delivery moves through
//! `Received → Sniffed → {Skipped | Decoded → Rendered} → Acknowledged`,
//! or ends as `Failed` without an acknowledgment.

mod dispatcher;

pub use dispatcher::*;
