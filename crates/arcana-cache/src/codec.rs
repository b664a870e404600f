//! Type-preserving translation between values and the store's wire format.
//!
//! Strings are written as-is, everything else as JSON. Decoding is
//! permissive: a payload that is not valid JSON comes back as the original
//! text instead of an error.

use crate::error::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Wire token for an undefined value.
pub const UNDEFINED_TOKEN: &str = "undefined";

/// Wire token for null.
pub const NULL_TOKEN: &str = "null";

/// A decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// The literal `undefined` token.
    Undefined,
    /// The literal `null` token.
    Null,
    /// A structured JSON value.
    Json(Value),
    /// Text that is not valid JSON, returned unchanged.
    Text(String),
}

impl CacheValue {
    /// True for `Undefined` and `Null`.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }
}

/// Encodes a serializable value.
///
/// Values that serialize to a JSON string are written without quotes.
/// Serialization failures propagate so a malformed value is never written.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CacheResult<String> {
    match serde_json::to_value(value).map_err(CacheError::Encode)? {
        Value::String(text) => Ok(text),
        other => serde_json::to_string(&other).map_err(CacheError::Encode),
    }
}

/// Encodes an already-decoded value.
pub fn encode_value(value: &CacheValue) -> CacheResult<String> {
    match value {
        CacheValue::Undefined => Ok(UNDEFINED_TOKEN.to_string()),
        CacheValue::Null => Ok(NULL_TOKEN.to_string()),
        CacheValue::Json(json) => encode(json),
        CacheValue::Text(text) => Ok(text.clone()),
    }
}

/// Decodes a wire string. Never fails.
#[must_use]
pub fn decode(raw: &str) -> CacheValue {
    match raw {
        UNDEFINED_TOKEN => CacheValue::Undefined,
        NULL_TOKEN => CacheValue::Null,
        _ => serde_json::from_str(raw)
            .map(CacheValue::Json)
            .unwrap_or_else(|_| CacheValue::Text(raw.to_string())),
    }
}

/// Decodes a wire string into `T`.
///
/// `undefined` and `null` yield `None`. A payload that parses as JSON but
/// does not fit `T` is retried as a plain string, so text such as `"42"`
/// written for a `String` field reads back as a `String`.
pub fn decode_as<T: DeserializeOwned>(raw: &str) -> Result<Option<T>, serde_json::Error> {
    match decode(raw) {
        CacheValue::Undefined | CacheValue::Null => Ok(None),
        // Encoded strings are never quoted, so a JSON string here was
        // written raw and its quotes belong to the value.
        CacheValue::Json(Value::String(_)) => serde_json::from_value(Value::String(raw.to_string())).map(Some),
        CacheValue::Json(json) => match serde_json::from_value(json) {
            Ok(value) => Ok(Some(value)),
            Err(err) => serde_json::from_value(Value::String(raw.to_string()))
                .map(Some)
                .map_err(|_| err),
        },
        CacheValue::Text(text) => serde_json::from_value(Value::String(text)).map(Some),
    }
}
