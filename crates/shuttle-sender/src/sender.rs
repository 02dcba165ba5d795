//! # Sender
//!
//! Turns application payloads into envelopes and hands them to the
//! transport, bounding every transport call with a deadline.
//!
//! ## Dispatch
//!
//! ```text
//! body ──marshal──▶ envelope ──options──▶ envelope ──spawn──▶ transport
//!                                                     │
//!                              select { result, ctx.done() }
//!                                                     │
//!                                        metrics + tracing
//! ```
//!
//! The transport call runs as its own task. Only the *wait* for it is bounded:
//! when the deadline wins the race the task is detached and keeps running
//! until the transport returns on its own. A transport that never returns
//! leaks its task.
//!
//! Every public operation increments exactly one of the success or failure
//! counters before returning, whichever stage failed.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use shuttle_telemetry::SenderMetrics;

use crate::body::MessageBody;
use crate::config::SenderOptions;
use crate::context::SendContext;
use crate::envelope::Envelope;
use crate::error::{Operation, SenderError};
use crate::marshaller::{JsonMarshaller, Marshaller};
use crate::options::{apply_options, with_trace_propagation, EnvelopeOption};
use crate::transport::{BatchOptions, MessageBatch, Transport, TransportError};
use crate::MSG_TYPE_FIELD;

/// Deadline-bounded dispatcher over a [`Transport`].
pub struct Sender<T: Transport, M: Marshaller = JsonMarshaller> {
    transport: Arc<T>,
    options: SenderOptions<M>,
    send_timeout: Option<Duration>,
}

impl<T: Transport> Sender<T> {
    /// Create a sender with JSON marshalling and the default 30s timeout.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_options(transport, SenderOptions::default())
    }
}

impl<T: Transport, M: Marshaller> Sender<T, M> {
    /// Create a sender with explicit options.
    pub fn with_options(transport: Arc<T>, options: SenderOptions<M>) -> Self {
        let send_timeout = options.send_timeout.resolve();
        Self {
            transport,
            options,
            send_timeout,
        }
    }

    /// The underlying transport, for calls outside the sender pipeline.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Resolved per-dispatch timeout, `None` when disabled.
    #[must_use]
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout
    }

    /// The options this sender was built with.
    #[must_use]
    pub fn options(&self) -> &SenderOptions<M> {
        &self.options
    }

    /// Marshal `body` and run `options` over the resulting envelope.
    ///
    /// The `type` property is set before any option runs. When trace
    /// propagation is enabled the trace context of `ctx` is injected after
    /// every caller option.
    pub fn build_envelope<B>(
        &self,
        ctx: &SendContext,
        body: &B,
        options: &[EnvelopeOption],
    ) -> Result<Envelope, SenderError>
    where
        B: MessageBody + ?Sized,
    {
        let mut envelope = Envelope::new(self.options.marshaller.marshal(body)?);
        envelope.content_type = Some(self.options.marshaller.content_type().to_string());
        envelope.set_property(MSG_TYPE_FIELD, body.message_type().into_owned());

        let trace = self
            .options
            .enable_tracing_propagation
            .then(|| with_trace_propagation(ctx.trace_context().clone()));

        apply_options(
            &mut envelope,
            options.iter().chain(trace.as_ref()),
            self.options.propagator.as_ref(),
        )?;
        Ok(envelope)
    }

    /// Send a single message.
    pub async fn send_message<B>(
        &self,
        ctx: &SendContext,
        body: &B,
        options: &[EnvelopeOption],
    ) -> Result<(), SenderError>
    where
        B: MessageBody + ?Sized,
    {
        let operation = Operation::SendMessage;
        let outcome = self.outcome(operation);
        let result = match self.build_envelope(ctx, body, options) {
            Ok(envelope) => {
                debug!(
                    operation = operation.as_str(),
                    message_type = envelope.message_type().unwrap_or_default(),
                    message_id = envelope.message_id.as_deref(),
                    "Dispatching message"
                );
                self.dispatch(&self.bounded(ctx), operation, move |transport, ctx| async move {
                    transport.send_message(ctx, envelope).await
                })
                .await
            }
            Err(e) => Err(e),
        };
        outcome.settle(result)
    }

    /// Send already built envelopes as one batch.
    ///
    /// Batch creation and the send share one deadline. The batch is filled
    /// in order and sent as a single transport call. The first envelope the
    /// batch rejects aborts the whole send.
    pub async fn send_message_batch(
        &self,
        ctx: &SendContext,
        messages: Vec<Envelope>,
    ) -> Result<(), SenderError> {
        let operation = Operation::SendMessageBatch;
        let outcome = self.outcome(operation);
        let ctx = self.bounded(ctx);
        let result = match self.fill_batch(&ctx, messages).await {
            Ok(batch) => {
                debug!(
                    operation = operation.as_str(),
                    messages = batch.len(),
                    size_bytes = batch.size_bytes(),
                    "Dispatching batch"
                );
                self.dispatch(&ctx, operation, move |transport, ctx| async move {
                    transport.send_message_batch(ctx, batch).await
                })
                .await
            }
            Err(e) => Err(e),
        };
        outcome.settle(result)
    }

    /// Schedule envelopes for `at`.
    ///
    /// Returns the sequence numbers exactly as the transport produced them.
    pub async fn schedule_messages(
        &self,
        ctx: &SendContext,
        messages: Vec<Envelope>,
        at: DateTime<Utc>,
    ) -> Result<Vec<i64>, SenderError> {
        let operation = Operation::ScheduleMessages;
        let outcome = self.outcome(operation);
        let result = self
            .dispatch(&self.bounded(ctx), operation, move |transport, ctx| async move {
                transport.schedule_messages(ctx, messages, at).await
            })
            .await;
        if let Ok(sequence_numbers) = &result {
            debug!(
                operation = operation.as_str(),
                ?sequence_numbers,
                enqueue_at = %at,
                "Messages scheduled"
            );
        }
        outcome.settle(result)
    }

    /// Cancel previously scheduled messages.
    ///
    /// `sequence_numbers` reach the transport unmodified.
    pub async fn cancel_scheduled_messages(
        &self,
        ctx: &SendContext,
        sequence_numbers: Vec<i64>,
    ) -> Result<(), SenderError> {
        let operation = Operation::CancelScheduledMessages;
        let outcome = self.outcome(operation);
        debug!(operation = operation.as_str(), ?sequence_numbers, "Cancelling scheduled messages");
        let result = self
            .dispatch(&self.bounded(ctx), operation, move |transport, ctx| async move {
                transport.cancel_scheduled_messages(ctx, sequence_numbers).await
            })
            .await;
        outcome.settle(result)
    }

    async fn fill_batch(
        &self,
        ctx: &SendContext,
        messages: Vec<Envelope>,
    ) -> Result<T::Batch, SenderError> {
        let mut batch = self
            .dispatch(ctx, Operation::CreateBatch, |transport, ctx| async move {
                transport.new_message_batch(&ctx, BatchOptions::default()).await
            })
            .await?;

        for envelope in messages {
            batch.add_message(envelope).map_err(SenderError::BatchAppend)?;
        }
        Ok(batch)
    }

    /// The caller's context narrowed by the send timeout, if enabled.
    fn bounded(&self, ctx: &SendContext) -> SendContext {
        match self.send_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    fn outcome(&self, operation: Operation) -> Outcome<'_> {
        Outcome {
            metrics: self.options.metrics.as_ref(),
            operation,
            settled: false,
        }
    }

    /// Run `call` as a detached task and wait for it at most until `ctx`
    /// finishes.
    async fn dispatch<R, F, Fut>(
        &self,
        ctx: &SendContext,
        operation: Operation,
        call: F,
    ) -> Result<R, SenderError>
    where
        R: Send + 'static,
        F: FnOnce(Arc<T>, SendContext) -> Fut,
        Fut: Future<Output = Result<R, TransportError>> + Send + 'static,
    {
        let task = tokio::spawn(call(Arc::clone(&self.transport), ctx.clone()));

        // The result wins a tie with the deadline.
        tokio::select! {
            biased;
            joined = task => match joined {
                Ok(result) => result.map_err(|e| SenderError::transport(operation, e)),
                Err(e) => Err(SenderError::transport(
                    operation,
                    TransportError::Other(format!("transport task failed: {e}")),
                )),
            },
            reason = ctx.done() => Err(SenderError::context(operation, reason)),
        }
    }
}

/// Records the outcome of one public call.
///
/// A call whose future is dropped before it settles counts as a failure.
struct Outcome<'a> {
    metrics: &'a dyn SenderMetrics,
    operation: Operation,
    settled: bool,
}

impl Outcome<'_> {
    fn settle<R>(mut self, result: Result<R, SenderError>) -> Result<R, SenderError> {
        self.settled = true;
        match &result {
            Ok(_) => {
                self.metrics.inc_send_success();
                debug!(operation = self.operation.as_str(), "Dispatch succeeded");
            }
            Err(e) => {
                self.metrics.inc_send_failure();
                warn!(operation = self.operation.as_str(), error = %e, "Dispatch failed");
            }
        }
        result
    }
}

impl Drop for Outcome<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.metrics.inc_send_failure();
            warn!(operation = self.operation.as_str(), "Dispatch dropped before completion");
        }
    }
}
