//! Recursive JSON merge for provenance payloads.

use serde_json::Value;

/// Merge `incoming` into `existing`.
///
/// Objects merge key by key, recursing where both sides hold an object; any
/// other incoming value replaces the existing one. Keys only present in
/// `existing` are kept.
pub fn deep_merge(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key.clone(), value.clone());
                } else if let Some(slot) = target.get_mut(key) {
                    deep_merge(slot, value);
                }
            }
        }
        (target, value) => *target = value.clone(),
    }
}

/// True for `None`, `""`, or whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
