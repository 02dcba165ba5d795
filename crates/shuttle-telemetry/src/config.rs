//! Telemetry configuration from environment variables.

use std::env;

/// Default service name reported in traces and logs.
pub const DEFAULT_SERVICE_NAME: &str = "shuttle";

/// Default prefix for every Prometheus metric the sender registers.
pub const DEFAULT_METRICS_NAMESPACE: &str = "shuttle";

/// Configuration for logging, tracing export and metrics naming.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// OTLP endpoint for span export. `None` keeps spans local.
    pub otlp_endpoint: Option<String>,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to write log lines to stdout
    pub console_output: bool,

    /// Whether log lines are JSON formatted
    pub json_logs: bool,

    /// Prefix for Prometheus metric names
    pub metrics_namespace: String,

    /// Deployment environment recorded on exported spans
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_namespace: DEFAULT_METRICS_NAMESPACE.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: shuttle)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: unset, no export)
    /// - `SHUTTLE_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SHUTTLE_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `SHUTTLE_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `SHUTTLE_METRICS_NAMESPACE`: Metric name prefix (default: shuttle)
    /// - `SHUTTLE_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            log_level: env::var("SHUTTLE_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("SHUTTLE_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("SHUTTLE_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(is_container),

            metrics_namespace: env::var("SHUTTLE_METRICS_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_METRICS_NAMESPACE.to_string()),

            environment: env::var("SHUTTLE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Configuration for a named service, everything else from the environment.
    pub fn for_service(service_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = service_name.to_string();
        config
    }

    /// Whether spans should be exported over OTLP.
    pub fn exports_spans(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

/// Parse a boolean-ish environment value, falling back to `default` when unrecognised.
pub fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
