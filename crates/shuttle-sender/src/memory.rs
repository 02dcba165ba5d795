//! # In-Memory Transport
//!
//! A single-node [`Transport`] for tests and local development.
//!
//! Delivered envelopes are recorded and broadcast to subscribers through
//! `tokio::sync::broadcast`. Scheduled envelopes receive increasing sequence
//! numbers and stay pending until cancelled. A distributed deployment uses a
//! real broker client instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::context::SendContext;
use crate::envelope::Envelope;
use crate::transport::{BatchOptions, MessageBatch, Transport, TransportError};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_BATCH_BYTES};

/// A message waiting for its scheduled enqueue time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledMessage {
    /// Sequence number assigned when scheduled.
    pub sequence_number: i64,
    /// When the message becomes visible.
    pub enqueue_at: DateTime<Utc>,
    /// The scheduled envelope.
    pub envelope: Envelope,
}

/// Batch produced by [`InMemoryTransport`].
#[derive(Debug)]
pub struct InMemoryBatch {
    max_bytes: usize,
    size_bytes: usize,
    envelopes: Vec<Envelope>,
}

impl InMemoryBatch {
    /// Create an empty batch capped at `max_bytes`.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            size_bytes: 0,
            envelopes: Vec::new(),
        }
    }

    /// Configured byte limit.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }
}

impl MessageBatch for InMemoryBatch {
    fn add_message(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        let size = envelope.encoded_len();
        let remaining = self.max_bytes - self.size_bytes;
        if size > remaining {
            return Err(TransportError::MessageTooLarge { size, remaining });
        }
        self.size_bytes += size;
        self.envelopes.push(envelope);
        Ok(())
    }

    fn len(&self) -> usize {
        self.envelopes.len()
    }

    fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

/// In-memory broker.
pub struct InMemoryTransport {
    /// Broadcast sender for delivered envelopes.
    sender: broadcast::Sender<Envelope>,

    /// Every envelope delivered so far, in delivery order.
    delivered: Mutex<Vec<Envelope>>,

    /// Whether [`InMemoryTransport::delivered`] keeps a history.
    record_history: bool,

    /// Pending scheduled messages by sequence number.
    scheduled: Mutex<BTreeMap<i64, ScheduledMessage>>,

    /// Next sequence number to hand out.
    next_sequence: AtomicI64,

    /// Default batch limit in bytes.
    max_batch_bytes: usize,

    /// Set once [`InMemoryTransport::close`] is called.
    closed: AtomicBool,
}

impl InMemoryTransport {
    /// Create a transport with default capacity and batch limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_BATCH_BYTES)
    }

    /// Create a transport with an explicit subscriber buffer and batch limit.
    ///
    /// A zero `capacity` is raised to one.
    #[must_use]
    pub fn with_limits(capacity: usize, max_batch_bytes: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            delivered: Mutex::new(Vec::new()),
            record_history: true,
            scheduled: Mutex::new(BTreeMap::new()),
            next_sequence: AtomicI64::new(1),
            max_batch_bytes,
            closed: AtomicBool::new(false),
        }
    }

    /// Stop recording delivered envelopes. Subscribers still receive them.
    #[must_use]
    pub fn without_history(mut self) -> Self {
        self.record_history = false;
        self
    }

    /// Receive every envelope delivered after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Snapshot of delivered envelopes.
    #[must_use]
    pub fn delivered(&self) -> Vec<Envelope> {
        self.delivered.lock().clone()
    }

    /// Snapshot of pending scheduled messages, ordered by sequence number.
    #[must_use]
    pub fn scheduled(&self) -> Vec<ScheduledMessage> {
        self.scheduled.lock().values().cloned().collect()
    }

    /// Reject every subsequent call with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn deliver(&self, envelopes: Vec<Envelope>) {
        let mut delivered = self.delivered.lock();
        for envelope in envelopes {
            if self.sender.send(envelope.clone()).is_err() {
                debug!(
                    message_type = envelope.message_type().unwrap_or_default(),
                    "Envelope delivered with no subscribers"
                );
            }
            if self.record_history {
                delivered.push(envelope);
            }
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    type Batch = InMemoryBatch;

    async fn send_message(
        &self,
        _ctx: SendContext,
        envelope: Envelope,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.deliver(vec![envelope]);
        Ok(())
    }

    async fn send_message_batch(
        &self,
        _ctx: SendContext,
        batch: InMemoryBatch,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.deliver(batch.into_envelopes());
        Ok(())
    }

    async fn new_message_batch(
        &self,
        _ctx: &SendContext,
        options: BatchOptions,
    ) -> Result<InMemoryBatch, TransportError> {
        self.ensure_open()?;
        let max_bytes = options
            .max_bytes
            .map_or(self.max_batch_bytes, |requested| requested.min(self.max_batch_bytes));
        Ok(InMemoryBatch::new(max_bytes))
    }

    async fn schedule_messages(
        &self,
        _ctx: SendContext,
        envelopes: Vec<Envelope>,
        at: DateTime<Utc>,
    ) -> Result<Vec<i64>, TransportError> {
        self.ensure_open()?;
        let mut scheduled = self.scheduled.lock();
        let sequence_numbers = envelopes
            .into_iter()
            .map(|envelope| {
                let sequence_number = self.next_sequence.fetch_add(1, Ordering::SeqCst);
                scheduled.insert(
                    sequence_number,
                    ScheduledMessage {
                        sequence_number,
                        enqueue_at: at,
                        envelope,
                    },
                );
                sequence_number
            })
            .collect();
        Ok(sequence_numbers)
    }

    async fn cancel_scheduled_messages(
        &self,
        _ctx: SendContext,
        sequence_numbers: Vec<i64>,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut scheduled = self.scheduled.lock();
        if let Some(unknown) = sequence_numbers
            .iter()
            .find(|seq| !scheduled.contains_key(*seq))
        {
            warn!(sequence_number = *unknown, "Cancel requested for unknown sequence number");
            return Err(TransportError::Rejected(format!(
                "unknown sequence number {unknown}"
            )));
        }
        for seq in &sequence_numbers {
            scheduled.remove(seq);
        }
        Ok(())
    }
}
