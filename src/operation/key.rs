//! Deterministic operation identity
//!
//! An `OperationKey` is the SHA-256 digest of a canonical encoding of an
//! operation's document and variables. The document is length-prefixed so
//! that no (document, variables) pair can be re-split into another pair with
//! the same byte stream. Variables are written as compact JSON with the keys
//! of every object sorted, so the caller's insertion order never leaks into
//! the identity, whichever map backs `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash type for content-based addressing
pub type ContentHash = [u8; 32];

/// Stable identity of an operation, derived from (document, variables)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey(ContentHash);

impl OperationKey {
    /// Derive the key for a document and its variables
    pub fn derive(document: &str, variables: &JsonValue) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((document.len() as u64).to_be_bytes());
        hasher.update(document.as_bytes());
        // Null and an empty object both mean "no variables"
        match variables {
            JsonValue::Null => hasher.update(b"{}"),
            JsonValue::Object(map) if map.is_empty() => hasher.update(b"{}"),
            other => hasher.update(canonical_json(other).as_bytes()),
        }
        Self(hasher.finalize().into())
    }

    /// Short prefix used in log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

/// Compact JSON for `value` with object keys in sorted order
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String(name.clone()).to_string());
                out.push(':');
                write_canonical(child, out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationKey({})", self.short())
    }
}
