//! Sender configuration.
//!
//! [`SenderOptions`] is resolved once when the sender is built and never
//! changes afterwards. [`SenderConfig`] carries the plain-data part of it and
//! can be read from the environment.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shuttle_telemetry::{parse_flag, NoopMetrics, SenderMetrics, TracePropagator, W3cTracePropagator};

use crate::marshaller::{JsonMarshaller, Marshaller};
use crate::DEFAULT_SEND_TIMEOUT;

/// How long a dispatch may wait for the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendTimeout {
    /// Wait up to [`DEFAULT_SEND_TIMEOUT`].
    #[default]
    Default,
    /// Wait up to the given duration. Zero means [`SendTimeout::Default`].
    After(Duration),
    /// Wait for as long as the caller's context allows.
    Disabled,
}

impl SendTimeout {
    /// Interpret a signed millisecond count: zero is the default, negative
    /// disables the deadline.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => Self::Default,
            m if m < 0 => Self::Disabled,
            m => Self::After(Duration::from_millis(m.unsigned_abs())),
        }
    }

    /// The deadline to apply per dispatch, `None` when disabled.
    #[must_use]
    pub fn resolve(self) -> Option<Duration> {
        match self {
            Self::Default => Some(DEFAULT_SEND_TIMEOUT),
            Self::After(timeout) if timeout.is_zero() => Some(DEFAULT_SEND_TIMEOUT),
            Self::After(timeout) => Some(timeout),
            Self::Disabled => None,
        }
    }
}

/// Plain-data sender settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderConfig {
    /// Inject the active trace context into every envelope.
    pub enable_tracing_propagation: bool,
    /// Bound on the wait for each transport call.
    pub send_timeout: SendTimeout,
}

impl SenderConfig {
    /// Read settings from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `SHUTTLE_SEND_TIMEOUT_MS`: signed milliseconds, 0 = default 30s, negative = disabled
    /// - `SHUTTLE_TRACE_PROPAGATION`: inject `traceparent` (default: false)
    pub fn from_env() -> Self {
        Self {
            enable_tracing_propagation: env::var("SHUTTLE_TRACE_PROPAGATION")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(false),

            send_timeout: env::var("SHUTTLE_SEND_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(SendTimeout::from_millis)
                .unwrap_or_default(),
        }
    }
}

/// Everything a sender needs besides its transport.
#[derive(Clone)]
pub struct SenderOptions<M = JsonMarshaller> {
    /// Encodes message bodies.
    pub marshaller: M,
    /// Inject the active trace context into every envelope.
    pub enable_tracing_propagation: bool,
    /// Bound on the wait for each transport call.
    pub send_timeout: SendTimeout,
    /// Outcome counters.
    pub metrics: Arc<dyn SenderMetrics>,
    /// Renders trace headers when propagation is enabled.
    pub propagator: Arc<dyn TracePropagator>,
}

impl Default for SenderOptions<JsonMarshaller> {
    fn default() -> Self {
        Self::with_marshaller(JsonMarshaller)
    }
}

impl<M: Marshaller> SenderOptions<M> {
    /// Default options around a custom marshaller.
    pub fn with_marshaller(marshaller: M) -> Self {
        Self {
            marshaller,
            enable_tracing_propagation: false,
            send_timeout: SendTimeout::Default,
            metrics: Arc::new(NoopMetrics),
            propagator: Arc::new(W3cTracePropagator::new()),
        }
    }

    /// Apply plain-data settings.
    #[must_use]
    pub fn config(mut self, config: SenderConfig) -> Self {
        self.enable_tracing_propagation = config.enable_tracing_propagation;
        self.send_timeout = config.send_timeout;
        self
    }

    /// Enable or disable trace propagation.
    #[must_use]
    pub fn tracing_propagation(mut self, enabled: bool) -> Self {
        self.enable_tracing_propagation = enabled;
        self
    }

    /// Set the send timeout.
    #[must_use]
    pub fn send_timeout(mut self, send_timeout: SendTimeout) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Set the metrics sink.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn SenderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set the trace propagator.
    #[must_use]
    pub fn propagator(mut self, propagator: Arc<dyn TracePropagator>) -> Self {
        self.propagator = propagator;
        self
    }
}

impl<M> fmt::Debug for SenderOptions<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderOptions")
            .field("marshaller", &std::any::type_name::<M>())
            .field("enable_tracing_propagation", &self.enable_tracing_propagation)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}
