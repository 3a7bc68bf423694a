//! Event dispatcher
//!
//! Pulls deliveries one at a time from a source, runs the two-stage decode,
//! renders accepted events and settles each delivery exactly once.

use thiserror::Error;

use crate::config::{ConsumerConfig, DecodeFailurePolicy};
use crate::protocol::{decode_envelope, decode_event, DecodeError, SchemaMismatch};
use crate::report::{render, ReportSink};
use crate::transport::{Delivery, DeliverySource, TransportError};

/// Dispatch errors. Both end the loop.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Report sink error: {0}")]
    Sink(#[from] std::io::Error),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// How a single delivery was handled
#[derive(Debug)]
pub enum Outcome {
    /// Event decoded, rendered and acknowledged
    Rendered,
    /// Envelope recognized as not-an-event and acknowledged
    Skipped(SchemaMismatch),
    /// Decode failed; settled according to the decode failure policy
    Failed(DecodeError),
}

impl Outcome {
    /// Check if the delivery was positively acknowledged
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Outcome::Rendered | Outcome::Skipped(_))
    }
}

/// Dispatch statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    /// Deliveries pulled from the source
    pub received: u64,
    /// Events rendered to the sink
    pub rendered: u64,
    /// Envelopes that did not pass the acceptance predicate
    pub skipped: u64,
    /// Deliveries that failed to decode
    pub failed: u64,
}

/// Drives deliveries from a source through decode, render and acknowledgment
pub struct Dispatcher<S, K> {
    source: S,
    sink: K,
    on_decode_error: DecodeFailurePolicy,
    stats: DispatchStats,
}

impl<S: DeliverySource, K: ReportSink> Dispatcher<S, K> {
    pub fn new(config: &ConsumerConfig, source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            on_decode_error: config.on_decode_error,
            stats: DispatchStats::default(),
        }
    }

    /// Get dispatch statistics
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Give back the source and sink, e.g. to close the source
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    /// Process deliveries until the source is exhausted
    pub async fn run(&mut self) -> DispatchResult<DispatchStats> {
        while let Some(delivery) = self.source.next_delivery().await? {
            self.dispatch(delivery).await?;
        }

        tracing::info!(
            "Source exhausted: {} received, {} rendered, {} skipped, {} failed",
            self.stats.received,
            self.stats.rendered,
            self.stats.skipped,
            self.stats.failed
        );
        Ok(self.stats.clone())
    }

    /// Handle a single delivery
    pub async fn dispatch(&mut self, delivery: Delivery) -> DispatchResult<Outcome> {
        self.stats.received += 1;
        tracing::info!(
            tag = delivery.tag,
            routing_key = %delivery.routing_key,
            redelivered = delivery.redelivered,
            "Received new message"
        );
        tracing::debug!("{}", String::from_utf8_lossy(&delivery.body));

        let outcome = self.handle(&delivery.body)?;

        match &outcome {
            Outcome::Rendered => {
                self.stats.rendered += 1;
            }
            Outcome::Skipped(reason) => {
                self.stats.skipped += 1;
                tracing::debug!(tag = delivery.tag, "Skipping message: {}", reason);
            }
            Outcome::Failed(e) => {
                self.stats.failed += 1;
                tracing::warn!(tag = delivery.tag, "Unable to decode message: {}", e);
            }
        }

        if outcome.is_acknowledged() {
            tracing::debug!(tag = delivery.tag, "Sending acknowledgement");
            self.source.ack(delivery.tag).await?;
        } else {
            self.settle_failure(delivery.tag).await?;
        }

        Ok(outcome)
    }

    fn handle(&mut self, body: &[u8]) -> DispatchResult<Outcome> {
        let envelope = match decode_envelope(body) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(Outcome::Failed(e)),
        };

        if let Err(mismatch) = envelope.check() {
            return Ok(Outcome::Skipped(mismatch));
        }

        let event = match decode_event(body) {
            Ok(event) => event,
            Err(e) => return Ok(Outcome::Failed(e)),
        };

        tracing::debug!(
            device = event.device.primary_id(),
            code = %event.code,
            "Decoded event"
        );
        self.sink.emit(&render(&event))?;

        Ok(Outcome::Rendered)
    }

    async fn settle_failure(&mut self, tag: u64) -> DispatchResult<()> {
        match self.on_decode_error {
            DecodeFailurePolicy::Leave => {
                tracing::debug!(tag, "Leaving message unacknowledged");
            }
            DecodeFailurePolicy::Reject => {
                tracing::debug!(tag, "Rejecting message");
                self.source.reject(tag, false).await?;
            }
            DecodeFailurePolicy::Requeue => {
                tracing::debug!(tag, "Rejecting message with requeue");
                self.source.reject(tag, true).await?;
            }
        }
        Ok(())
    }
}
