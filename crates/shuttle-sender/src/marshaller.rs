//! # Marshallers
//!
//! Convert a [`MessageBody`] into the bytes carried by an [`Envelope`](crate::Envelope).

use thiserror::Error;

use crate::body::MessageBody;

/// Content type written by [`JsonMarshaller`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type written by [`BincodeMarshaller`].
pub const BINCODE_CONTENT_TYPE: &str = "application/x-bincode";

/// Errors raised while encoding a payload.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// JSON encoding failed.
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode encoding failed.
    #[error("bincode encoding failed: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Encodes message bodies. Must be deterministic for a given payload.
pub trait Marshaller: Send + Sync + 'static {
    /// MIME type recorded on every envelope this marshaller produces.
    fn content_type(&self) -> &'static str;

    /// Encode `body`.
    fn marshal<B: MessageBody + ?Sized>(&self, body: &B) -> Result<Vec<u8>, MarshalError>;
}

/// Default marshaller, encodes bodies as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaller;

impl Marshaller for JsonMarshaller {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn marshal<B: MessageBody + ?Sized>(&self, body: &B) -> Result<Vec<u8>, MarshalError> {
        Ok(serde_json::to_vec(body)?)
    }
}

/// Compact binary marshaller backed by bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeMarshaller;

impl Marshaller for BincodeMarshaller {
    fn content_type(&self) -> &'static str {
        BINCODE_CONTENT_TYPE
    }

    fn marshal<B: MessageBody + ?Sized>(&self, body: &B) -> Result<Vec<u8>, MarshalError> {
        Ok(bincode::serialize(body)?)
    }
}
