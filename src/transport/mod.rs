//! Transport module - Sources of queue deliveries
//!
//! Provides:
//! - The `DeliverySource` abstraction the dispatcher pulls from
//! - An AMQP source backed by a broker queue
//! - An in-memory source for offline decoding

mod amqp;
mod memory;

pub use amqp::*;
pub use memory::*;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Unknown or already settled delivery tag: {0}")]
    UnknownDeliveryTag(u64),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One message handed over by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Opaque tag used to acknowledge this delivery
    pub tag: u64,
    /// Raw message body
    pub body: Bytes,
    /// Routing key the message was published with
    pub routing_key: String,
    /// Whether the broker delivered this message before
    pub redelivered: bool,
}

/// A sequential source of deliveries with acknowledgment capability.
///
/// Every delivery must be settled (acked or rejected) on the source that
/// produced it, at most once.
#[async_trait]
pub trait DeliverySource: Send {
    /// Wait for the next delivery; `None` once the source is exhausted
    async fn next_delivery(&mut self) -> TransportResult<Option<Delivery>>;

    /// Positively acknowledge a delivery
    async fn ack(&mut self, tag: u64) -> TransportResult<()>;

    /// Negatively acknowledge a delivery
    async fn reject(&mut self, tag: u64, requeue: bool) -> TransportResult<()>;

    /// Release the underlying resources
    async fn close(&mut self) -> TransportResult<()> {
        Ok(())
    }
}
