//! Deterministic serialization of documents. Field order comes from the
//! struct declarations and every map is insertion ordered, so marshaling the
//! same document twice yields the same bytes.

use serde::Serialize;

use crate::error::FormatError;

pub fn to_yaml<T: Serialize>(doc: &T) -> Result<Vec<u8>, FormatError> {
    Ok(serde_yaml_ng::to_string(doc)?.into_bytes())
}

pub fn to_json<T: Serialize>(doc: &T) -> Result<Vec<u8>, FormatError> {
    Ok(serde_json::to_vec(doc)?)
}

pub fn to_json_pretty<T: Serialize>(doc: &T) -> Result<Vec<u8>, FormatError> {
    Ok(serde_json::to_vec_pretty(doc)?)
}
