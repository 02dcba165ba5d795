//! # Sender Errors
//!
//! Every failure a dispatch can end in. Transport and context failures are
//! prefixed with the operation that hit them; the underlying error stays
//! reachable through [`SenderError::transport_error`] and `source()`.

use std::fmt;
use thiserror::Error;

use crate::context::ContextError;
use crate::marshaller::MarshalError;
use crate::options::OptionError;
use crate::transport::TransportError;

/// The sender operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SendMessage,
    SendMessageBatch,
    CreateBatch,
    ScheduleMessages,
    CancelScheduledMessages,
}

impl Operation {
    /// Human-readable verb phrase used in error messages and log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send message",
            Self::SendMessageBatch => "send message batch",
            Self::CreateBatch => "create message batch",
            Self::ScheduleMessages => "schedule messages",
            Self::CancelScheduledMessages => "cancel scheduled messages",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`Sender`](crate::Sender) operations.
#[derive(Debug, Error)]
pub enum SenderError {
    /// The payload could not be encoded.
    #[error("failed to marshal message body: {0}")]
    Marshal(#[from] MarshalError),

    /// An envelope option failed.
    #[error("failed to run message options: {0}")]
    Option(#[from] OptionError),

    /// A message could not be added to the batch.
    #[error("failed to add message to batch: {0}")]
    BatchAppend(#[source] TransportError),

    /// The transport call failed.
    #[error("failed to {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    /// The wait for the transport outlived the context deadline.
    #[error("failed to {operation}: context deadline exceeded")]
    DeadlineExceeded { operation: Operation },

    /// The caller cancelled the context before the transport returned.
    #[error("failed to {operation}: context canceled")]
    Cancelled { operation: Operation },
}

impl SenderError {
    pub(crate) fn transport(operation: Operation, source: TransportError) -> Self {
        Self::Transport { operation, source }
    }

    pub(crate) fn context(operation: Operation, reason: ContextError) -> Self {
        match reason {
            ContextError::DeadlineExceeded => Self::DeadlineExceeded { operation },
            ContextError::Cancelled => Self::Cancelled { operation },
        }
    }

    /// The transport error behind this failure, if any.
    #[must_use]
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } | Self::BatchAppend(source) => Some(source),
            _ => None,
        }
    }

    /// The context error behind this failure, if any.
    #[must_use]
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::DeadlineExceeded { .. } => Some(ContextError::DeadlineExceeded),
            Self::Cancelled { .. } => Some(ContextError::Cancelled),
            _ => None,
        }
    }

    /// Whether the bounded wait expired before the transport answered.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// The operation a transport or context failure belongs to.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. }
            | Self::DeadlineExceeded { operation }
            | Self::Cancelled { operation } => Some(*operation),
            _ => None,
        }
    }
}
