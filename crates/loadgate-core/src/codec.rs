//! Text codec for the JSON-valued columns of the store.
//!
//! Distributions (label -> count), test thresholds and run options live in
//! memory as typed values and in storage only as text. An empty or absent
//! value is stored as the empty string rather than `{}` to keep rows small,
//! and the empty string reads back as absent. Malformed stored text is an
//! error for the read; it is never treated as empty.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Label -> occurrence count, e.g. error message -> count.
pub type Distribution = BTreeMap<String, u64>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {column}: {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {column} in storage: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Encode a distribution for storage. Empty or absent maps become `""`.
pub fn encode_distribution(
    column: &'static str,
    dist: Option<&Distribution>,
) -> Result<String, CodecError> {
    match dist {
        Some(d) if !d.is_empty() => encode_value(column, d),
        _ => Ok(String::new()),
    }
}

/// Decode a stored distribution. `""` decodes to `None`.
pub fn decode_distribution(
    column: &'static str,
    text: &str,
) -> Result<Option<Distribution>, CodecError> {
    decode_value(column, text)
}

/// Serialize any value to compact JSON text.
pub(crate) fn encode_value<T: Serialize + ?Sized>(
    column: &'static str,
    value: &T,
) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|source| CodecError::Encode { column, source })
}

/// Parse stored JSON text; blank text is absent.
pub(crate) fn decode_value<T: DeserializeOwned>(
    column: &'static str,
    text: &str,
) -> Result<Option<T>, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|source| CodecError::Decode { column, source })
}
