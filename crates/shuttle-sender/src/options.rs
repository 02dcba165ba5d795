//! # Envelope Options
//!
//! Ordered mutations applied to an envelope after marshalling. Options are
//! plain values; the chain is folded left to right and stops at the first
//! error. Later options overwrite fields set by earlier ones.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::envelope::Envelope;
use shuttle_telemetry::TracePropagator;

/// Errors raised by an option while mutating an envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionError {
    /// A relative delay does not fit in a timestamp.
    #[error("message delay {0:?} is out of range")]
    DelayOutOfRange(Duration),

    /// A caller-supplied option rejected the envelope.
    #[error("{0}")]
    Rejected(String),
}

type CustomFn = dyn Fn(&mut Envelope) -> Result<(), OptionError> + Send + Sync;

/// A single envelope mutation.
#[derive(Clone)]
pub enum EnvelopeOption {
    /// Set the broker message identifier.
    MessageId(String),
    /// Set the correlation identifier.
    CorrelationId(String),
    /// Schedule the message at an absolute time.
    ScheduleAt(DateTime<Utc>),
    /// Schedule the message relative to the moment the option is applied.
    Delay(Duration),
    /// Expire the message after the given duration.
    TimeToLive(Duration),
    /// Write the headers of a trace context into the application properties.
    TracePropagation(opentelemetry::Context),
    /// Arbitrary caller-defined mutation.
    Custom(Arc<CustomFn>),
}

impl fmt::Debug for EnvelopeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageId(id) => f.debug_tuple("MessageId").field(id).finish(),
            Self::CorrelationId(id) => f.debug_tuple("CorrelationId").field(id).finish(),
            Self::ScheduleAt(at) => f.debug_tuple("ScheduleAt").field(at).finish(),
            Self::Delay(delay) => f.debug_tuple("Delay").field(delay).finish(),
            Self::TimeToLive(ttl) => f.debug_tuple("TimeToLive").field(ttl).finish(),
            Self::TracePropagation(_) => f.write_str("TracePropagation(..)"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl EnvelopeOption {
    /// Apply this option to `envelope`.
    ///
    /// `propagator` renders trace headers for [`EnvelopeOption::TracePropagation`].
    pub fn apply(
        &self,
        envelope: &mut Envelope,
        propagator: &dyn TracePropagator,
    ) -> Result<(), OptionError> {
        match self {
            Self::MessageId(id) => envelope.message_id = Some(id.clone()),
            Self::CorrelationId(id) => envelope.correlation_id = Some(id.clone()),
            Self::ScheduleAt(at) => envelope.scheduled_enqueue_time = Some(*at),
            Self::Delay(delay) => {
                let offset = chrono::Duration::from_std(*delay)
                    .map_err(|_| OptionError::DelayOutOfRange(*delay))?;
                let at = Utc::now()
                    .checked_add_signed(offset)
                    .ok_or(OptionError::DelayOutOfRange(*delay))?;
                envelope.scheduled_enqueue_time = Some(at);
            }
            Self::TimeToLive(ttl) => envelope.time_to_live = Some(*ttl),
            Self::TracePropagation(cx) => {
                for (key, value) in propagator.inject(cx) {
                    envelope.set_property(key, value);
                }
            }
            Self::Custom(mutate) => (**mutate)(envelope)?,
        }
        Ok(())
    }
}

/// Set the message identifier.
pub fn set_message_id(message_id: impl Into<String>) -> EnvelopeOption {
    EnvelopeOption::MessageId(message_id.into())
}

/// Set the correlation identifier.
pub fn set_correlation_id(correlation_id: impl Into<String>) -> EnvelopeOption {
    EnvelopeOption::CorrelationId(correlation_id.into())
}

/// Schedule the message to be enqueued at `at`.
pub fn set_schedule_at(at: DateTime<Utc>) -> EnvelopeOption {
    EnvelopeOption::ScheduleAt(at)
}

/// Schedule the message `delay` after the option is applied.
pub fn set_message_delay(delay: Duration) -> EnvelopeOption {
    EnvelopeOption::Delay(delay)
}

/// Set the message time-to-live.
pub fn set_message_ttl(ttl: Duration) -> EnvelopeOption {
    EnvelopeOption::TimeToLive(ttl)
}

/// Propagate `cx` into the message properties.
pub fn with_trace_propagation(cx: opentelemetry::Context) -> EnvelopeOption {
    EnvelopeOption::TracePropagation(cx)
}

/// Wrap a caller-defined mutation.
pub fn custom<F>(mutate: F) -> EnvelopeOption
where
    F: Fn(&mut Envelope) -> Result<(), OptionError> + Send + Sync + 'static,
{
    EnvelopeOption::Custom(Arc::new(mutate))
}

/// Apply `options` in order, stopping at the first failure.
pub fn apply_options<'a, I>(
    envelope: &mut Envelope,
    options: I,
    propagator: &dyn TracePropagator,
) -> Result<(), OptionError>
where
    I: IntoIterator<Item = &'a EnvelopeOption>,
{
    options
        .into_iter()
        .try_for_each(|option| option.apply(envelope, propagator))
}
