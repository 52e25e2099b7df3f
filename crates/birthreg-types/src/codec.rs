//! Textual record codec.
//!
//! Values are written as compact, field-named JSON. Decoding tolerates
//! missing fields, and record types keep unknown ones, so stored records
//! survive schema additions.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};

/// Encode a value into its stored byte form.
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a value from its stored byte form.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
