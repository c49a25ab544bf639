//! Dotted key-path access over nested JSON objects.
//!
//! Responsibilities:
//! - Read a nested value addressed by a path such as `query.sslrootcert`.
//! - Overwrite a nested value whose parent objects already exist.
//!
//! Invariants:
//! - `get` never fails; a missing segment or a non-object intermediate yields `None`.
//! - `set` never creates intermediate objects.

use serde_json::{Map, Value};

use crate::loader::ConfigError;

/// Returns the value at `path`, descending one object per dot-separated segment.
pub fn get<'a>(obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = obj.get(segments.next()?)?;
    segments.try_fold(first, |current, segment| current.as_object()?.get(segment))
}

/// Assigns `value` at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::KeyPath`] if any intermediate segment is missing or
/// is not an object.
pub fn set(obj: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), ConfigError> {
    let (parent_path, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let mut current = obj;
    for segment in parent_path.into_iter().flat_map(|parent| parent.split('.')) {
        current = current
            .get_mut(segment)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ConfigError::KeyPath {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
    }

    current.insert(last.to_string(), value);
    Ok(())
}
