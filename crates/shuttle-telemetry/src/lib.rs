//! # Shuttle Telemetry
//!
//! Observability plumbing for the shuttle sender.
//!
//! ## Components
//!
//! - **Metrics**: [`SenderMetrics`] sink with a Prometheus implementation
//! - **Trace propagation**: [`TracePropagator`] rendering `traceparent` headers
//! - **Tracing**: `tracing-subscriber` setup with optional OTLP span export
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shuttle_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let telemetry = init_telemetry(config).await.expect("Failed to init telemetry");
//!
//!     // Hand telemetry.metrics() to every sender the process builds
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP endpoint, export disabled when unset |
//! | `OTEL_SERVICE_NAME` | `shuttle` | Service name in traces |
//! | `SHUTTLE_LOG_LEVEL` | `info` | Log level filter |
//! | `SHUTTLE_METRICS_NAMESPACE` | `shuttle` | Metric name prefix |

mod config;
mod context;
mod metrics;
mod tracing_setup;

pub use config::{parse_flag, TelemetryConfig, DEFAULT_METRICS_NAMESPACE, DEFAULT_SERVICE_NAME};
pub use context::{
    TraceContext, TracePropagator, W3cTracePropagator, TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
pub use metrics::{
    encode_metrics, NoopMetrics, PrometheusSenderMetrics, SenderMetrics, OUTCOME_FAILURE,
    OUTCOME_SUCCESS,
};
pub use tracing_setup::{init_tracing, TracingGuard};

use prometheus::Registry;
use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize tracing and register sender metrics in a fresh registry.
///
/// The returned guard must be held for the lifetime of the application.
/// Dropping it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    if config.metrics_namespace.is_empty() {
        return Err(TelemetryError::Config(
            "metrics namespace must not be empty".to_string(),
        ));
    }

    // Metrics first, they have no global side effects
    let registry = Registry::new();
    let metrics = PrometheusSenderMetrics::register(&config.metrics_namespace, &registry)?;

    let tracing_guard = init_tracing(&config).await?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        registry,
        metrics,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    registry: Registry,
    metrics: Arc<PrometheusSenderMetrics>,
}

impl TelemetryGuard {
    /// The registry the sender metrics were registered into.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Sender metrics sink to inject into senders.
    pub fn metrics(&self) -> Arc<PrometheusSenderMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
