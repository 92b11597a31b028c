//! Custom metadata replace and merge semantics.
//!
//! `set` replaces a namespace's metadata wholesale; `patch` merges a delta
//! key by key, where `None` is the removal marker (omission means "no
//! change", so removal has to be signalled explicitly). The loosely typed
//! JSON boundary of the API layer is converted here, rejecting non-string
//! values instead of coercing them.

use sealbox_common::{CustomMetadata, Error, Result};
use std::collections::BTreeMap;

/// A metadata patch: `Some(v)` sets the key, `None` removes it, and keys
/// absent from the delta are preserved.
pub type MetadataDelta = BTreeMap<String, Option<String>>;

/// Full-replace semantics for `set`: the delta becomes the metadata, and
/// an absent delta clears it.
#[must_use]
pub fn replace(delta: Option<CustomMetadata>) -> CustomMetadata {
    delta.unwrap_or_default()
}

/// Merge a patch delta into existing metadata.
#[must_use]
pub fn merge(existing: &CustomMetadata, delta: &MetadataDelta) -> CustomMetadata {
    let mut result = existing.clone();
    for (key, value) in delta {
        match value {
            Some(v) => {
                result.insert(key.clone(), v.clone());
            }
            None => {
                result.remove(key);
            }
        }
    }
    result
}

/// Convert a loosely typed JSON map into metadata, rejecting non-string
/// values.
pub fn metadata_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<CustomMetadata> {
    let mut metadata = CustomMetadata::new();
    for (key, value) in map {
        match value {
            serde_json::Value::String(s) => {
                metadata.insert(key.clone(), s.clone());
            }
            other => {
                return Err(Error::invalid_metadata(format!(
                    "value for key {key:?} must be a string, got {other}"
                )));
            }
        }
    }
    Ok(metadata)
}

/// Convert a loosely typed JSON map into a patch delta. JSON `null` is the
/// removal marker; any other non-string value is rejected.
pub fn delta_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<MetadataDelta> {
    let mut delta = MetadataDelta::new();
    for (key, value) in map {
        match value {
            serde_json::Value::String(s) => {
                delta.insert(key.clone(), Some(s.clone()));
            }
            serde_json::Value::Null => {
                delta.insert(key.clone(), None);
            }
            other => {
                return Err(Error::invalid_metadata(format!(
                    "value for key {key:?} must be a string or null, got {other}"
                )));
            }
        }
    }
    Ok(delta)
}

/// Enforce the cap on a namespace's total serialized metadata size.
pub fn check_size(metadata: &CustomMetadata, max_bytes: usize) -> Result<()> {
    let serialized = serde_json::to_vec(metadata)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    if serialized.len() > max_bytes {
        return Err(Error::invalid_metadata(format!(
            "serialized metadata is {} bytes, cap is {max_bytes}",
            serialized.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, &str)]) -> CustomMetadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_replace() {
        assert_eq!(replace(None), CustomMetadata::new());
        assert_eq!(replace(Some(meta(&[("a", "1")]))), meta(&[("a", "1")]));
    }

    #[test]
    fn test_merge_sets_and_preserves() {
        let existing = meta(&[("a", "1")]);
        let delta: MetadataDelta = [("b".to_string(), Some("2".to_string()))].into();
        assert_eq!(merge(&existing, &delta), meta(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_merge_overwrites_and_removes() {
        let existing = meta(&[("a", "1"), ("b", "2")]);
        let delta: MetadataDelta = [
            ("a".to_string(), Some("9".to_string())),
            ("b".to_string(), None),
        ]
        .into();
        assert_eq!(merge(&existing, &delta), meta(&[("a", "9")]));
        // removing an absent key is a no-op
        let delta: MetadataDelta = [("missing".to_string(), None)].into();
        assert_eq!(merge(&existing, &delta), existing);
    }

    #[test]
    fn test_metadata_from_json() {
        let map = json!({"owner": "alice"});
        let metadata = metadata_from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(metadata, meta(&[("owner", "alice")]));

        let bad = json!({"count": 3});
        assert!(matches!(
            metadata_from_json(bad.as_object().unwrap()),
            Err(Error::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_delta_from_json() {
        let map = json!({"keep": "v", "drop": null});
        let delta = delta_from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(delta.get("keep").unwrap(), &Some("v".to_string()));
        assert_eq!(delta.get("drop").unwrap(), &None);

        let bad = json!({"flag": true});
        assert!(matches!(
            delta_from_json(bad.as_object().unwrap()),
            Err(Error::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_check_size() {
        let small = meta(&[("a", "1")]);
        assert!(check_size(&small, 4096).is_ok());

        let big = meta(&[("key", &"x".repeat(100))]);
        assert!(matches!(
            check_size(&big, 64),
            Err(Error::InvalidMetadata(_))
        ));
    }
}
