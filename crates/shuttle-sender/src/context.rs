//! # Send Context
//!
//! Carries the caller's deadline, cancellation signal and trace context into
//! a dispatch. The sender derives a child context with its own timeout and
//! hands it to the transport; the transport may honour it or ignore it, the
//! sender's wait is bounded either way.

use std::future::pending;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Duration, Instant};

use shuttle_telemetry::TraceContext;

/// Why a context finished.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The caller cancelled the context.
    #[error("context canceled")]
    Cancelled,
}

/// Deadline, cancellation and trace context for one dispatch.
#[derive(Debug, Clone)]
pub struct SendContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
    otel: opentelemetry::Context,
}

/// Cancels every context derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the associated contexts. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl SendContext {
    /// An empty context: no deadline, never cancelled, no trace.
    #[must_use]
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: None,
            otel: opentelemetry::Context::new(),
        }
    }

    /// A context carrying the trace context of the active span.
    #[must_use]
    pub fn current() -> Self {
        Self::background().with_trace_context(TraceContext::extract_current())
    }

    /// Replace the trace context.
    #[must_use]
    pub fn with_trace_context(mut self, otel: opentelemetry::Context) -> Self {
        self.otel = otel;
        self
    }

    /// Child context expiring `timeout` from now, or at the parent's
    /// deadline if that comes first.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        self.with_deadline(deadline)
    }

    /// Child context expiring at `deadline`, or at the parent's deadline if
    /// that comes first.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Child context that can be cancelled through the returned handle.
    ///
    /// Cancelling the parent still cancels the child. Must be called from
    /// within a tokio runtime when the parent is itself cancellable.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        if let Some(parent) = self.cancel.clone() {
            let child = tx.clone();
            tokio::spawn(forward_cancellation(parent, child));
        }
        let ctx = Self {
            cancel: Some(rx),
            ..self.clone()
        };
        (ctx, CancelHandle { tx })
    }

    /// When this context expires, if ever.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The trace context to propagate.
    #[must_use]
    pub fn trace_context(&self) -> &opentelemetry::Context {
        &self.otel
    }

    /// Why the context is finished, or `None` if it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> ContextError {
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            () = wait_cancelled(self.cancel.clone()) => ContextError::Cancelled,
            () = expired => ContextError::DeadlineExceeded,
        }
    }
}

impl Default for SendContext {
    fn default() -> Self {
        Self::background()
    }
}

async fn wait_cancelled(cancel: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel else {
        return pending().await;
    };
    // A dropped handle can no longer cancel.
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        pending::<()>().await;
    }
}

async fn forward_cancellation(parent: watch::Receiver<bool>, child: watch::Sender<bool>) {
    tokio::select! {
        () = wait_cancelled(Some(parent)) => {
            child.send_replace(true);
        }
        () = child.closed() => {}
    }
}

fn far_future() -> Instant {
    // Roughly 30 years, as tokio does for unbounded sleeps.
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
