//! # Shuttle Sender - Deadline-Bounded Message Dispatch
//!
//! Wraps a message-broker transport with a pipeline that marshals payloads,
//! applies envelope options, propagates trace context and records outcome
//! metrics, bounding every transport call with a deadline.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐  build_envelope   ┌──────────┐   dispatch    ┌───────────┐
//! │   Caller   │ ────────────────▶ │ Envelope │ ────────────▶ │ Transport │
//! │            │  marshal+options  │          │  spawn+race   │           │
//! └────────────┘                   └──────────┘               └───────────┘
//!                                                     │
//!                                                     ▼
//!                                               SenderMetrics
//! ```
//!
//! ## Guarantees
//!
//! - **Bounded wait:** no operation waits past its deadline, even when the
//!   transport never returns
//! - **One outcome per call:** exactly one success or failure increment
//! - **Typed envelopes:** the `type` property is set before any option runs

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod body;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod marshaller;
pub mod memory;
pub mod options;
pub mod sender;
pub mod transport;

use std::time::Duration;

// Re-export main types
pub use body::MessageBody;
pub use config::{SendTimeout, SenderConfig, SenderOptions};
pub use context::{CancelHandle, ContextError, SendContext};
pub use envelope::Envelope;
pub use error::{Operation, SenderError};
pub use marshaller::{BincodeMarshaller, JsonMarshaller, MarshalError, Marshaller};
pub use memory::{InMemoryBatch, InMemoryTransport, ScheduledMessage};
pub use options::{
    apply_options, custom, set_correlation_id, set_message_delay, set_message_id,
    set_message_ttl, set_schedule_at, with_trace_propagation, EnvelopeOption, OptionError,
};
pub use sender::Sender;
pub use transport::{BatchOptions, MessageBatch, Transport, TransportError};

/// Application property holding the payload's type tag.
pub const MSG_TYPE_FIELD: &str = "type";

/// Send timeout applied when none is configured.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelopes buffered per in-memory subscriber before they lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// In-memory batch limit in bytes.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 256 * 1024;
