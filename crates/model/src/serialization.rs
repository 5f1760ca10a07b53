//! Canonical JSON serialization and artifact hashing.
//!
//! Model artifacts are written with deterministically sorted object
//! keys and stable 2-space formatting so the same model always produces
//! the same bytes, and hashed with BLAKE3 so deployments can verify
//! what they loaded.

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::collections::BTreeMap;

use crate::errors::Result;

/// Recursively rebuild a JSON value with sorted object keys.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a value into canonical pretty JSON.
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    canonical.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Hex-encoded BLAKE3 hash of an artifact's bytes.
pub fn artifact_hash(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}
