//! Feed Codec
//!
//! JSON decoding for the upstream feed, split into three stages so that a
//! failure at one stage only discards what that stage covers:
//!
//! 1. `decode_frame`: one text frame into a list of untyped values
//! 2. `decode_envelope`: one value into a classified `Envelope`
//! 3. `decode_aggregate` / `decode_quote`: one payload into a raw record

use serde::Serialize;

use super::messages::{Envelope, RawEnvelope};
use crate::domain::market_data::{RawEquityAggregate, RawOptionQuote};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is neither a JSON array nor a JSON object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the venue feed.
#[derive(Debug, Default, Clone)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Split a text frame into its envelope values.
    ///
    /// The venue sends arrays; a bare object is treated as a one-element
    /// batch. Blank frames yield an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON or is a JSON scalar.
    pub fn decode_frame(&self, text: &str) -> Result<Vec<serde_json::Value>, CodecError> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            Ok(vec![])
        } else if trimmed.starts_with('[') {
            Ok(serde_json::from_str(trimmed)?)
        } else if trimmed.starts_with('{') {
            Ok(vec![serde_json::from_str(trimmed)?])
        } else {
            Err(CodecError::InvalidFormat(format!(
                "expected JSON array or object, got: {}...",
                trimmed.chars().take(50).collect::<String>()
            )))
        }
    }

    /// Classify one envelope value without touching its payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an envelope object.
    pub fn decode_envelope(&self, value: serde_json::Value) -> Result<Envelope, CodecError> {
        let raw: RawEnvelope = serde_json::from_value(value)?;
        Ok(raw.into())
    }

    /// Decode an aggregate payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing or has the wrong type.
    pub fn decode_aggregate(
        &self,
        data: serde_json::Value,
    ) -> Result<RawEquityAggregate, CodecError> {
        Ok(serde_json::from_value(data)?)
    }

    /// Decode an option quote payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing or has the wrong type.
    pub fn decode_quote(&self, data: serde_json::Value) -> Result<RawOptionQuote, CodecError> {
        Ok(serde_json::from_value(data)?)
    }

    /// Encode a value to JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}
