//! Cache fingerprints for `(operation, params)` pairs

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::Params;

/// Separator between operation name and canonical params in the digest input
const DELIMITER: char = '|';

/// Deterministic SHA-256 digest identifying one `(operation, params)` pair.
///
/// Params are serialized with keys sorted at every nesting level, so two
/// bags that differ only in key order produce the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn new(operation: &str, params: &Params) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(DELIMITER.to_string().as_bytes());
        hasher.update(canonical_params(params).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest (64 lowercase characters)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize params as compact JSON with keys sorted lexicographically.
#[must_use]
pub fn canonical_params(params: &Params) -> String {
    let object: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), canonical_value(v)))
        .collect();
    Value::Object(object).to_string()
}

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical_value(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}
