// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Pub/sub adapter (spec §4.6).
//!
//! `Publisher`/`ConsumerLoop` are the narrow capability interfaces (spec §9:
//! "avoid baking the substrate's envelope shape into business code"); an
//! envelope carries only `{message_id, event_type, timestamp, stage}` —
//! never the directive payload. [`InMemoryBus`] is an in-memory reference
//! implementation with at-least-once redelivery and a dead-letter sink,
//! generalizing the priority-queue discipline used elsewhere in this
//! codebase's pub/sub-adjacent pieces to carry envelopes instead of runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ra_core::stage::Stage;
use ra_error::RezError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A tiny pub/sub message: identifies a directive without carrying its
/// payload (spec §6 "inbound directive envelope").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    /// Back-reference to the directive this envelope announces.
    pub message_id: String,
    /// Always `"message_created"` for the directive lifecycle this core handles.
    pub event_type: String,
    /// When the envelope was published.
    pub timestamp: DateTime<Utc>,
    /// Deployment stage, carried for routing/filtering.
    pub stage: Stage,
}

impl Envelope {
    /// Construct the envelope ingress publishes after creating a directive.
    #[must_use]
    pub fn for_directive(message_id: impl Into<String>, stage: Stage) -> Self {
        Self { message_id: message_id.into(), event_type: "message_created".to_string(), timestamp: Utc::now(), stage }
    }
}

/// Default redelivery budget before an envelope is moved to the dead-letter
/// queue (spec §4.6 "target: 3").
pub const DEFAULT_MAX_REDELIVERIES: u32 = 3;

/// Publish an envelope to a named topic (spec §4.6).
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `envelope` to `topic`.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on substrate failure.
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), RezError>;
}

/// Consume batches of envelopes from a named queue with per-item ack/nack
/// (spec §4.6: "at-least-once... re-delivers only the failed ones").
#[async_trait]
pub trait ConsumerLoop: Send + Sync {
    /// Receive up to `max` envelopes from `queue`. May return fewer.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on substrate failure.
    async fn receive_batch(&self, queue: &str, max: usize) -> Result<Vec<Envelope>, RezError>;

    /// Acknowledge successful processing of `message_id`, clearing its
    /// redelivery count.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on substrate failure.
    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), RezError>;

    /// Report failed processing of `envelope`; the substrate redelivers it
    /// up to the configured redelivery budget, then moves it to the DLQ.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on substrate failure.
    async fn nack(&self, queue: &str, envelope: Envelope) -> Result<(), RezError>;

    /// Envelopes that exhausted their redelivery budget.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on substrate failure.
    async fn dead_letters(&self, queue: &str) -> Result<Vec<Envelope>, RezError>;
}

/// In-memory `Publisher` + `ConsumerLoop` for tests and local/dev use.
pub struct InMemoryBus {
    queues: Mutex<HashMap<String, VecDeque<Envelope>>>,
    redelivery_counts: Mutex<HashMap<(String, String), u32>>,
    dead_letters: Mutex<HashMap<String, Vec<Envelope>>>,
    max_redeliveries: u32,
}

impl InMemoryBus {
    /// Build a bus with the default redelivery budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_redeliveries(DEFAULT_MAX_REDELIVERIES)
    }

    /// Build a bus with an explicit redelivery budget before DLQ.
    #[must_use]
    pub fn with_max_redeliveries(max_redeliveries: u32) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            redelivery_counts: Mutex::new(HashMap::new()),
            dead_letters: Mutex::new(HashMap::new()),
            max_redeliveries,
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for InMemoryBus {
    async fn publish(&self, topic: &str, envelope: Envelope) -> Result<(), RezError> {
        self.queues.lock().await.entry(topic.to_string()).or_default().push_back(envelope);
        Ok(())
    }
}

#[async_trait]
impl ConsumerLoop for InMemoryBus {
    async fn receive_batch(&self, queue: &str, max: usize) -> Result<Vec<Envelope>, RezError> {
        let mut queues = self.queues.lock().await;
        let q = queues.entry(queue.to_string()).or_default();
        let n = max.min(q.len());
        Ok(q.drain(..n).collect())
    }

    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), RezError> {
        self.redelivery_counts.lock().await.remove(&(queue.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn nack(&self, queue: &str, envelope: Envelope) -> Result<(), RezError> {
        let key = (queue.to_string(), envelope.message_id.clone());
        let mut counts = self.redelivery_counts.lock().await;
        let count = counts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > self.max_redeliveries {
            counts.remove(&key);
            drop(counts);
            self.dead_letters.lock().await.entry(queue.to_string()).or_default().push(envelope);
        } else {
            drop(counts);
            self.queues.lock().await.entry(queue.to_string()).or_default().push_back(envelope);
        }
        Ok(())
    }

    async fn dead_letters(&self, queue: &str) -> Result<Vec<Envelope>, RezError> {
        Ok(self.dead_letters.lock().await.get(queue).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: &str) -> Envelope {
        Envelope::for_directive(id, Stage::Dev)
    }

    // -- 1. publish then receive_batch delivers in FIFO order ----------------
    #[tokio::test]
    async fn publish_then_receive_fifo() {
        let bus = InMemoryBus::new();
        bus.publish("web_actions", envelope("m1")).await.unwrap();
        bus.publish("web_actions", envelope("m2")).await.unwrap();
        let batch = bus.receive_batch("web_actions", 10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].message_id, "m1");
    }

    // -- 2. receive_batch respects max and leaves the remainder queued -------
    #[tokio::test]
    async fn receive_batch_respects_max() {
        let bus = InMemoryBus::new();
        for i in 0..5 {
            bus.publish("q", envelope(&format!("m{i}"))).await.unwrap();
        }
        let first = bus.receive_batch("q", 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let rest = bus.receive_batch("q", 10).await.unwrap();
        assert_eq!(rest.len(), 3);
    }

    // -- 3. ack clears redelivery tracking, not affecting future deliveries --
    #[tokio::test]
    async fn ack_clears_tracking() {
        let bus = InMemoryBus::new();
        bus.ack("q", "m1").await.unwrap();
        assert!(bus.dead_letters("q").await.unwrap().is_empty());
    }

    // -- 4. nack under the redelivery budget requeues the envelope -----------
    #[tokio::test]
    async fn nack_under_budget_requeues() {
        let bus = InMemoryBus::with_max_redeliveries(3);
        bus.publish("q", envelope("m1")).await.unwrap();
        let batch = bus.receive_batch("q", 1).await.unwrap();
        bus.nack("q", batch.into_iter().next().unwrap()).await.unwrap();
        let redelivered = bus.receive_batch("q", 1).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert!(bus.dead_letters("q").await.unwrap().is_empty());
    }

    // -- 5. retry bound: after max_redeliveries nacks the envelope reaches the DLQ (spec §8 invariant 9) --
    #[tokio::test]
    async fn exhausting_redeliveries_reaches_dlq() {
        let bus = InMemoryBus::with_max_redeliveries(3);
        bus.publish("q", envelope("m1")).await.unwrap();

        let mut deliveries = 0;
        loop {
            let batch = bus.receive_batch("q", 1).await.unwrap();
            if batch.is_empty() {
                break;
            }
            deliveries += 1;
            bus.nack("q", batch.into_iter().next().unwrap()).await.unwrap();
        }

        assert_eq!(deliveries, 4); // 1 initial delivery + 3 redeliveries
        let dlq = bus.dead_letters("q").await.unwrap();
        assert_eq!(dlq.len(), 1);
        assert_eq!(dlq[0].message_id, "m1");
    }

    // -- 6. envelopes never carry a payload field ----------------------------
    #[test]
    fn envelope_shape_matches_spec() {
        let e = envelope("m1");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["event_type"], "message_created");
        assert!(json.get("payload").is_none());
    }
}
