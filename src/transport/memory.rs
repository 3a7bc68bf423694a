//! In-memory delivery source
//!
//! Feeds a fixed list of message bodies through the dispatcher and records
//! how each one was settled. Used by the `decode` subcommand.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeSet, VecDeque};

use super::{Delivery, DeliverySource, TransportError, TransportResult};

/// A negative acknowledgment recorded by `MemorySource`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub tag: u64,
    pub requeue: bool,
}

/// Delivery source backed by a queue in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    pending: VecDeque<Delivery>,
    in_flight: BTreeSet<u64>,
    next_tag: u64,
    acked: Vec<u64>,
    rejected: Vec<Rejection>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message body, returning its delivery tag
    pub fn push(&mut self, body: impl Into<Bytes>) -> u64 {
        // AMQP delivery tags start at 1
        self.next_tag += 1;
        self.pending.push_back(Delivery {
            tag: self.next_tag,
            body: body.into(),
            routing_key: String::new(),
            redelivered: false,
        });
        self.next_tag
    }

    /// Tags acknowledged so far, in order
    pub fn acked(&self) -> &[u64] {
        &self.acked
    }

    /// Rejections so far, in order
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    /// Tags delivered but not yet settled
    pub fn unsettled(&self) -> Vec<u64> {
        self.in_flight.iter().copied().collect()
    }

    fn settle(&mut self, tag: u64) -> TransportResult<()> {
        if self.in_flight.remove(&tag) {
            Ok(())
        } else {
            Err(TransportError::UnknownDeliveryTag(tag))
        }
    }
}

#[async_trait]
impl DeliverySource for MemorySource {
    async fn next_delivery(&mut self) -> TransportResult<Option<Delivery>> {
        let delivery = self.pending.pop_front();
        if let Some(delivery) = &delivery {
            self.in_flight.insert(delivery.tag);
        }
        Ok(delivery)
    }

    async fn ack(&mut self, tag: u64) -> TransportResult<()> {
        self.settle(tag)?;
        self.acked.push(tag);
        Ok(())
    }

    async fn reject(&mut self, tag: u64, requeue: bool) -> TransportResult<()> {
        self.settle(tag)?;
        self.rejected.push(Rejection { tag, requeue });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_deliveries_in_push_order() {
        let mut source = MemorySource::new();
        source.push(&b"first"[..]);
        source.push(&b"second"[..]);

        let first = source.next_delivery().await.unwrap().unwrap();
        let second = source.next_delivery().await.unwrap().unwrap();

        assert_eq!(first.tag, 1);
        assert_eq!(first.body, Bytes::from_static(b"first"));
        assert_eq!(second.tag, 2);
        assert!(source.next_delivery().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ack_settles_once() {
        let mut source = MemorySource::new();
        let tag = source.push(Vec::from("body"));
        source.next_delivery().await.unwrap();

        assert_eq!(source.unsettled(), vec![tag]);
        assert_ok!(source.ack(tag).await);
        assert_err!(source.ack(tag).await);
        assert_eq!(source.acked(), &[tag]);
        assert!(source.unsettled().is_empty());
    }

    #[tokio::test]
    async fn test_cannot_settle_undelivered() {
        let mut source = MemorySource::new();
        let tag = source.push(Vec::from("body"));

        assert_err!(source.reject(tag, false).await);
    }

    #[tokio::test]
    async fn test_reject_is_recorded() {
        let mut source = MemorySource::new();
        let tag = source.push(Vec::from("body"));
        source.next_delivery().await.unwrap();

        assert_ok!(source.reject(tag, true).await);
        assert_eq!(source.rejected(), &[Rejection { tag, requeue: true }]);
        assert!(source.acked().is_empty());
    }
}
