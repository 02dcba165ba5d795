//! # Message Envelope
//!
//! The transport message under construction. One envelope is built per send
//! call, mutated by the option chain, handed to the transport and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::MSG_TYPE_FIELD;

/// A transport-ready message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Marshalled payload.
    pub body: Vec<u8>,

    /// MIME type of `body`, set by the marshaller.
    pub content_type: Option<String>,

    /// Application properties. Always holds `type` once built by a sender.
    pub application_properties: HashMap<String, serde_json::Value>,

    /// Broker-level message identifier.
    pub message_id: Option<String>,

    /// Identifier correlating this message with a request or conversation.
    pub correlation_id: Option<String>,

    /// When the broker should make the message visible.
    pub scheduled_enqueue_time: Option<DateTime<Utc>>,

    /// How long the broker keeps the message before expiring it.
    pub time_to_live: Option<Duration>,
}

impl Envelope {
    /// Create an envelope around an already marshalled body.
    #[must_use]
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// The `type` property, if set and a string.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.application_properties
            .get(MSG_TYPE_FIELD)
            .and_then(serde_json::Value::as_str)
    }

    /// Set an application property, replacing any previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.application_properties.insert(key.into(), value.into());
    }

    /// Read an application property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.application_properties.get(key)
    }

    /// Approximate size on the wire, used for batch accounting.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let properties: usize = self
            .application_properties
            .iter()
            .map(|(key, value)| key.len() + value.to_string().len())
            .sum();

        self.body.len()
            + properties
            + self.content_type.as_ref().map_or(0, String::len)
            + self.message_id.as_ref().map_or(0, String::len)
            + self.correlation_id.as_ref().map_or(0, String::len)
    }
}
