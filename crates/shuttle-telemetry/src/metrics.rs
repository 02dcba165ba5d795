//! Prometheus metrics for the shuttle sender.
//!
//! The sender reports one outcome per dispatch attempt through the
//! [`SenderMetrics`] sink. Metric names follow `<namespace>_sender_<metric>_<unit>`.
//!
//! Registration is explicit: the process builds a [`PrometheusSenderMetrics`],
//! registers it once into its [`Registry`] at startup, and hands the sink to
//! every sender it constructs.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

/// Label value recorded for a successful dispatch.
pub const OUTCOME_SUCCESS: &str = "success";

/// Label value recorded for a failed dispatch (including timeouts).
pub const OUTCOME_FAILURE: &str = "failure";

/// Outcome counters incremented by the sender.
///
/// Implementations must be cheap and non-blocking. They are called on the
/// dispatch path and must never fail it.
pub trait SenderMetrics: Send + Sync {
    /// Record a dispatch that the transport acknowledged.
    fn inc_send_success(&self);

    /// Record a dispatch that failed at any stage.
    fn inc_send_failure(&self);
}

/// Sink that discards every increment. Used when no metrics are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl SenderMetrics for NoopMetrics {
    fn inc_send_success(&self) {}

    fn inc_send_failure(&self) {}
}

impl<M: SenderMetrics + ?Sized> SenderMetrics for Arc<M> {
    fn inc_send_success(&self) {
        (**self).inc_send_success();
    }

    fn inc_send_failure(&self) {
        (**self).inc_send_failure();
    }
}

/// Prometheus-backed sender metrics.
#[derive(Debug, Clone)]
pub struct PrometheusSenderMetrics {
    messages: IntCounterVec,
    success: IntCounter,
    failure: IntCounter,
}

impl PrometheusSenderMetrics {
    /// Build the counters without registering them.
    pub fn new(namespace: &str) -> Result<Self, TelemetryError> {
        let messages = IntCounterVec::new(
            Opts::new(
                format!("{namespace}_sender_messages_total"),
                "Messages dispatched by the sender, by outcome",
            ),
            &["outcome"], // outcome: success/failure
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        // Resolve the children once so increments skip the label lookup.
        let success = messages
            .get_metric_with_label_values(&[OUTCOME_SUCCESS])
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        let failure = messages
            .get_metric_with_label_values(&[OUTCOME_FAILURE])
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        Ok(Self {
            messages,
            success,
            failure,
        })
    }

    /// Build the counters and register them with `registry`.
    ///
    /// Registering the same namespace twice in one registry fails with
    /// [`TelemetryError::MetricsInit`].
    pub fn register(namespace: &str, registry: &Registry) -> Result<Arc<Self>, TelemetryError> {
        let metrics = Self::new(namespace)?;
        registry
            .register(Box::new(metrics.messages.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        tracing::debug!(namespace = namespace, "Sender metrics registered");
        Ok(Arc::new(metrics))
    }

    /// Number of successful dispatches recorded so far.
    pub fn success_count(&self) -> u64 {
        self.success.get()
    }

    /// Number of failed dispatches recorded so far.
    pub fn failure_count(&self) -> u64 {
        self.failure.get()
    }
}

impl SenderMetrics for PrometheusSenderMetrics {
    fn inc_send_success(&self) {
        self.success.inc();
    }

    fn inc_send_failure(&self) {
        self.failure.inc();
    }
}

/// Encode every metric in `registry` as Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
