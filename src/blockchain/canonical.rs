use serde_json::Value;
use sha2::{Digest, Sha256};

/// Encodes a JSON value canonically
///
/// Compact output with object keys sorted at every depth, so two semantically
/// equal values always produce the same string. `serde_json` keeps objects in
/// a `BTreeMap` unless its `preserve_order` feature is on, which this crate
/// never enables.
pub fn encode(value: &Value) -> String {
    value.to_string()
}

/// SHA-256 of the given bytes as a lowercase hexadecimal string
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the canonical encoding of a JSON value
pub fn digest(value: &Value) -> String {
    digest_bytes(encode(value).as_bytes())
}
