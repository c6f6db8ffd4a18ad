//! Single-field updates of YAML documents
//!
//! The document is parsed into a tree, the scalar at a dotted key path is
//! replaced in the tree, and the whole tree is serialized back and written
//! atomically. Values are stored as YAML data, never spliced into document
//! text, so separators, quotes, backslashes or `$(...)` in a value are kept
//! verbatim.

use super::atomic::atomic_write;
use crate::error::WriteError;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Set the scalar at `key` (dot-separated) inside `doc`
///
/// Intermediate keys must already exist and be mappings. The leaf may be
/// missing (it is created) or a scalar/null (it is replaced); replacing a
/// mapping or sequence is refused.
pub fn set_field(doc: &mut Value, key: &str, value: Value) -> Result<(), String> {
    if matches!(value, Value::Mapping(_) | Value::Sequence(_) | Value::Tagged(_)) {
        return Err("only scalar values can be set".to_string());
    }

    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(format!("invalid key path '{}'", key));
    }

    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| "empty key path".to_string())?;

    let mut current = doc;
    for segment in parents {
        current = match current {
            Value::Mapping(map) => map
                .get_mut(*segment)
                .ok_or_else(|| format!("key '{}' not found", segment))?,
            _ => return Err(format!("'{}' is not inside a mapping", segment)),
        };
    }

    let map: &mut Mapping = match current {
        Value::Mapping(map) => map,
        _ => return Err(format!("parent of '{}' is not a mapping", leaf)),
    };

    if let Some(existing) = map.get(*leaf) {
        if matches!(existing, Value::Mapping(_) | Value::Sequence(_)) {
            return Err(format!("'{}' is not a scalar", key));
        }
    }

    map.insert(Value::String(leaf.to_string()), value);
    Ok(())
}

/// Read the scalar at `key` (dot-separated), if present
pub fn get_field<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(doc, |current, segment| match current {
        Value::Mapping(map) => map.get(segment),
        _ => None,
    })
}

/// Update one scalar of the YAML document at `path` and write it back atomically
pub fn update_field(path: &Path, key: &str, value: impl Into<Value>) -> Result<(), WriteError> {
    let field_err = |reason: String| WriteError::Field {
        path: path.to_path_buf(),
        key: key.to_string(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|source| WriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc: Value = serde_yaml::from_str(&content).map_err(|e| field_err(e.to_string()))?;

    set_field(&mut doc, key, value.into()).map_err(field_err)?;

    let updated = serde_yaml::to_string(&doc).map_err(|e| field_err(e.to_string()))?;
    atomic_write(path, updated)
}
