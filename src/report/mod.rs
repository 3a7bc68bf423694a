//! Report module - Turns decoded events into console reports
//!
//! Provides:
//! - The event renderer (pure formatting)
//! - Sinks that accept finished reports

mod render;
mod sink;

pub use render::*;
pub use sink::*;
