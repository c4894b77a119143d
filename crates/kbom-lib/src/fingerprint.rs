//! Content fingerprints used as BOM references
//!
//! A fingerprint is 64 bits of a SHA-256 over a canonical walk of the value's
//! serialized form, rendered as 16 lowercase hex characters. Two rules keep it
//! stable across runs:
//!
//! - sequences are sets: element order never changes the result
//! - zero values (`null`, `""`, `0`, `false`, `[]`, `{}`) are all the same
//!   "absent" value, and absent struct fields are left out of the hash

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

type Digest64 = [u8; 8];

const TAG_ABSENT: u8 = b'0';
const TAG_BOOL: u8 = b'b';
const TAG_NUMBER: u8 = b'n';
const TAG_STRING: u8 = b's';
const TAG_SET: u8 = b'a';
const TAG_OBJECT: u8 = b'o';

/// Fingerprint any serializable value.
///
/// Never fails: if the value cannot be serialized the result is an empty
/// string, which callers treat as "no reference".
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(value) => hex::encode(digest(&value).unwrap_or_else(absent)),
        Err(e) => {
            warn!(error = %e, "Failed to fingerprint value, leaving reference unset");
            String::new()
        }
    }
}

/// Digest of a value, `None` when it is a zero value
fn digest(value: &Value) -> Option<Digest64> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(leaf(TAG_BOOL, b"true")),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(leaf(TAG_NUMBER, n.to_string().as_bytes()))
            }
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(leaf(TAG_STRING, s.as_bytes())),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => {
            let mut members: Vec<Digest64> = items
                .iter()
                .map(|item| digest(item).unwrap_or_else(absent))
                .collect();
            members.sort_unstable();

            let mut hasher = Sha256::new();
            hasher.update([TAG_SET]);
            for member in &members {
                hasher.update(member);
            }
            Some(truncate(hasher.finalize().as_slice()))
        }
        Value::Object(fields) => {
            let mut present: Vec<(&String, Digest64)> = fields
                .iter()
                .filter_map(|(key, field)| digest(field).map(|d| (key, d)))
                .collect();
            if present.is_empty() {
                return None;
            }
            present.sort_unstable_by(|a, b| a.0.cmp(b.0));

            let mut hasher = Sha256::new();
            hasher.update([TAG_OBJECT]);
            for (key, field) in present {
                hasher.update((key.len() as u64).to_be_bytes());
                hasher.update(key.as_bytes());
                hasher.update(field);
            }
            Some(truncate(hasher.finalize().as_slice()))
        }
    }
}

fn leaf(tag: u8, bytes: &[u8]) -> Digest64 {
    let mut hasher = Sha256::new();
    hasher.update([tag]);
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
    truncate(hasher.finalize().as_slice())
}

fn absent() -> Digest64 {
    leaf(TAG_ABSENT, &[])
}

fn truncate(full: &[u8]) -> Digest64 {
    let mut out = [0u8; 8];
    out.copy_from_slice(&full[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize, Default)]
    struct Limits {
        cpu: String,
        memory: String,
    }

    #[derive(Serialize, Default)]
    struct Record {
        name: String,
        tags: Vec<String>,
        labels: Option<HashMap<String, String>>,
        limits: Option<Limits>,
        replicas: u32,
    }

    fn record(tags: &[&str]) -> Record {
        Record {
            name: "web".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_is_16_lowercase_hex() {
        let id = fingerprint(&record(&["a"]));
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint(&record(&["a", "b"])), fingerprint(&record(&["a", "b"])));
    }

    #[test]
    fn test_sequence_order_does_not_matter() {
        assert_eq!(
            fingerprint(&record(&["a", "b", "c"])),
            fingerprint(&record(&["c", "a", "b"]))
        );
    }

    #[test]
    fn test_content_changes_fingerprint() {
        assert_ne!(fingerprint(&record(&["a"])), fingerprint(&record(&["b"])));

        let mut other = record(&["a"]);
        other.name = "api".to_string();
        assert_ne!(fingerprint(&record(&["a"])), fingerprint(&other));
    }

    #[test]
    fn test_none_hashes_like_empty() {
        let mut with_none = record(&[]);
        with_none.labels = None;
        with_none.limits = None;

        let mut with_empty = record(&[]);
        with_empty.labels = Some(HashMap::new());
        with_empty.limits = Some(Limits::default());

        assert_eq!(fingerprint(&with_none), fingerprint(&with_empty));
    }

    #[test]
    fn test_map_iteration_order_does_not_matter() {
        let mut a = HashMap::new();
        let mut b = HashMap::new();
        for i in 0..32 {
            a.insert(format!("key-{i}"), i.to_string());
        }
        for i in (0..32).rev() {
            b.insert(format!("key-{i}"), i.to_string());
        }

        let mut left = record(&[]);
        left.labels = Some(a);
        let mut right = record(&[]);
        right.labels = Some(b);

        assert_eq!(fingerprint(&left), fingerprint(&right));
    }

    #[test]
    fn test_zero_number_hashes_like_missing_field() {
        #[derive(Serialize)]
        struct Named {
            name: String,
        }

        let zero = record(&[]);
        let named = Named {
            name: "web".to_string(),
        };
        assert_eq!(fingerprint(&zero), fingerprint(&named));
    }

    #[test]
    fn test_unserializable_value_yields_empty_string() {
        let mut bad: BTreeMap<(i32, i32), i32> = BTreeMap::new();
        bad.insert((1, 2), 3);
        assert_eq!(fingerprint(&bad), "");
    }

    #[test]
    fn test_empty_value_still_has_a_fingerprint() {
        assert_eq!(fingerprint(&Record::default()).len(), 16);
    }
}
