//! Trace context propagation for outgoing messages.
//!
//! When a message leaves the process, the active trace context is written
//! into the message's application properties so the consumer can continue
//! the same distributed trace.
//!
//! ## How It Works
//!
//! 1. The caller runs inside a span (or an explicit `opentelemetry::Context`)
//! 2. [`TraceContext::extract_current`] resolves that context
//! 3. A [`TracePropagator`] renders it as header key/value pairs
//!    (`traceparent`, and `tracestate` when present)
//! 4. The sender merges the pairs into the message properties
//!
//! A missing or invalid span context renders to no headers at all.

use opentelemetry::{
    propagation::TextMapPropagator,
    trace::{TraceContextExt, TraceId},
    Context,
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::collections::HashMap;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// W3C header carrying version, trace id, parent span id and flags.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// W3C header carrying vendor-specific trace state.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Renders a trace context as header key/value pairs.
pub trait TracePropagator: Send + Sync {
    /// Headers describing `cx`. Empty when `cx` carries no valid span.
    fn inject(&self, cx: &Context) -> HashMap<String, String>;
}

/// W3C Trace Context propagator.
#[derive(Debug, Default)]
pub struct W3cTracePropagator {
    inner: TraceContextPropagator,
}

impl W3cTracePropagator {
    /// Create a new W3C propagator.
    pub fn new() -> Self {
        Self {
            inner: TraceContextPropagator::new(),
        }
    }
}

impl TracePropagator for W3cTracePropagator {
    fn inject(&self, cx: &Context) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if !cx.span().span_context().is_valid() {
            return headers;
        }
        self.inner.inject_context(cx, &mut headers);
        // An empty trace state still renders a `tracestate` entry.
        headers.retain(|_, value| !value.is_empty());
        headers
    }
}

/// Helpers for resolving the active trace context.
pub struct TraceContext;

impl TraceContext {
    /// Extract the trace context of the active span.
    ///
    /// Prefers the current `tracing` span (bridged through
    /// `tracing-opentelemetry`) and falls back to the thread's attached
    /// `opentelemetry::Context`.
    pub fn extract_current() -> Context {
        let from_span = tracing::Span::current().context();
        if from_span.span().span_context().is_valid() {
            return from_span;
        }
        Context::current()
    }

    /// Trace id of `cx`, if it carries a valid span.
    pub fn trace_id(cx: &Context) -> Option<TraceId> {
        let span = cx.span();
        let span_context = span.span_context();
        if span_context.is_valid() {
            Some(span_context.trace_id())
        } else {
            None
        }
    }
}
