//! Reversible payload encoding for oversized values.
//!
//! # Responsibility
//! - Encode values whose serialized form crosses the configured threshold.
//! - Wrap encoded payloads in a tagged envelope the store recognizes on read.
//!
//! # Invariants
//! - `decode(encode(v))` is deep-equal to `v` for every JSON value.
//! - The envelope is distinguishable from raw values without guessing:
//!   `encoded == true` plus a string `data` field.
//! - The transform is a uniform storage representation, not compression.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

/// Codec-layer error for envelope and transform failures.
#[derive(Debug)]
pub enum CodecError {
    /// Value cannot be serialized to canonical JSON.
    Serialize(serde_json::Error),
    /// Encoded payload cannot be reversed back into a value.
    Decode(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "payload serialization failed: {err}"),
            Self::Decode(message) => write!(f, "payload decode failed: {message}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Decode(_) => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Tagged wrapper persisted in place of a raw value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedEnvelope {
    /// Discriminator; always `true` for envelopes written by [`encode`].
    pub encoded: bool,
    /// Reversible textual encoding of the original JSON value.
    pub data: String,
    /// RFC3339 instant at which the payload was encoded.
    pub encoded_at: String,
}

/// Returns whether a persisted value is an encoding envelope.
pub fn is_envelope(value: &Value) -> bool {
    value.get("encoded").and_then(Value::as_bool) == Some(true)
        && value.get("data").map_or(false, Value::is_string)
}

/// Encodes `value` into a tagged envelope.
///
/// The payload is the base64 form of the value's canonical JSON text. Any
/// reversible textual transform satisfies the contract; base64 keeps the
/// stored representation uniform and ASCII-safe.
pub fn encode(value: &Value) -> CodecResult<EncodedEnvelope> {
    let json = serde_json::to_string(value)?;
    Ok(EncodedEnvelope {
        encoded: true,
        data: BASE64.encode(json.as_bytes()),
        encoded_at: Utc::now().to_rfc3339(),
    })
}

/// Decodes an envelope back into the original value.
///
/// # Errors
/// - `CodecError::Decode` when the payload is not valid base64, not valid
///   UTF-8, or not valid JSON. Callers treat that as data loss for the key.
pub fn decode(envelope: &EncodedEnvelope) -> CodecResult<Value> {
    let bytes = BASE64
        .decode(envelope.data.as_bytes())
        .map_err(|err| CodecError::Decode(format!("invalid base64 payload: {err}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|err| CodecError::Decode(format!("payload is not UTF-8: {err}")))?;
    serde_json::from_str(&json)
        .map_err(|err| CodecError::Decode(format!("payload is not valid JSON: {err}")))
}

/// Decodes a persisted value that may or may not be an envelope.
///
/// Raw values pass through unchanged; envelopes are reversed.
pub fn decode_if_envelope(value: Value) -> CodecResult<Value> {
    if !is_envelope(&value) {
        return Ok(value);
    }
    let envelope: EncodedEnvelope = serde_json::from_value(value)
        .map_err(|err| CodecError::Decode(format!("malformed envelope: {err}")))?;
    decode(&envelope)
}
