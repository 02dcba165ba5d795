//! # Transport Capability
//!
//! The narrow interface the sender consumes from a broker client. The
//! broker's wire protocol, connection management and retries all live
//! behind it.
//!
//! Implementations receive the sender's [`SendContext`] and may use its
//! deadline, but nothing requires them to: the sender bounds its own wait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::context::SendContext;
use crate::envelope::Envelope;

/// Errors returned by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The message does not fit in the batch.
    #[error("message of {size} bytes exceeds the remaining batch capacity of {remaining} bytes")]
    MessageTooLarge { size: usize, remaining: usize },

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Options for creating a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum batch size in bytes. `None` uses the transport's limit.
    pub max_bytes: Option<usize>,
}

/// A batch container filled before a single send.
pub trait MessageBatch: Send + 'static {
    /// Append an envelope, failing if the batch cannot hold it.
    fn add_message(&mut self, envelope: Envelope) -> Result<(), TransportError>;

    /// Number of envelopes in the batch.
    fn len(&self) -> usize;

    /// Whether the batch holds no envelopes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes used so far.
    fn size_bytes(&self) -> usize;
}

/// Broker operations consumed by the sender.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Batch container produced by [`Transport::new_message_batch`].
    type Batch: MessageBatch;

    /// Send a single envelope.
    async fn send_message(&self, ctx: SendContext, envelope: Envelope)
        -> Result<(), TransportError>;

    /// Send a filled batch as one request.
    async fn send_message_batch(
        &self,
        ctx: SendContext,
        batch: Self::Batch,
    ) -> Result<(), TransportError>;

    /// Create an empty batch.
    async fn new_message_batch(
        &self,
        ctx: &SendContext,
        options: BatchOptions,
    ) -> Result<Self::Batch, TransportError>;

    /// Schedule envelopes for `at`, returning one sequence number per envelope.
    async fn schedule_messages(
        &self,
        ctx: SendContext,
        envelopes: Vec<Envelope>,
        at: DateTime<Utc>,
    ) -> Result<Vec<i64>, TransportError>;

    /// Cancel previously scheduled messages.
    async fn cancel_scheduled_messages(
        &self,
        ctx: SendContext,
        sequence_numbers: Vec<i64>,
    ) -> Result<(), TransportError>;
}
