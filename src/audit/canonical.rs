//! Canonical encoding and hashing for audit entries
//!
//! The chain is only verifiable if every writer and verifier produce the
//! same bytes for the same content. Canonical form: JSON with object keys
//! sorted lexicographically at every level, no insignificant whitespace,
//! and every decimal already serialized as its exact string form by the
//! type layer. No timestamp participates outside `performedAt`.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Chain head value before the first entry: 64 zero hex digits.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Serialize a JSON value canonically: sorted keys, compact separators.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json's escaping is deterministic
            match serde_json::to_string(s) {
                Ok(escaped) => out.push_str(&escaped),
                Err(_) => out.push_str("\"\""),
            }
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                match serde_json::to_string(key) {
                    Ok(escaped) => out.push_str(&escaped),
                    Err(_) => out.push_str("\"\""),
                }
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_value(out, v);
                }
            }
            out.push('}');
        }
    }
}

/// SHA-256 of a canonical string, lowercase hex.
pub fn sha256_hex(canonical: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Hash a JSON value via its canonical encoding.
pub fn hash_value(value: &Value) -> String {
    sha256_hex(&canonical_json(value))
}
