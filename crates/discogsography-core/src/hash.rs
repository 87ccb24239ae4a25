//! Content hashing used by the sink services to skip unchanged records.
//!
//! Matches `hashlib.sha256(json.dumps(payload, sort_keys=True).encode()).hexdigest()`
//! from the original Python sinks: keys are sorted recursively before hashing so
//! re-serialization order never changes the digest.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Recursively sort object keys so two semantically-identical payloads with
/// differently-ordered fields serialize to the same bytes.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Hex-encoded SHA-256 of the canonicalized JSON payload.
pub fn content_hash(payload: &Value) -> String {
    let canonical = canonicalize(payload);
    let bytes = serde_json::to_vec(&canonical).expect("canonicalized json always serializes");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = json!({"id": 1, "name": "Foo"});
        let b = json!({"name": "Foo", "id": 1});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn nested_key_order_does_not_affect_hash() {
        let a = json!({"id": 1, "meta": {"a": 1, "b": 2}});
        let b = json!({"meta": {"b": 2, "a": 1}, "id": 1});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"id": 1});
        let b = json!({"id": 2});
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!({"ids": [1, 2, 3]});
        let b = json!({"ids": [3, 2, 1]});
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
