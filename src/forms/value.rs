//! Helpers over dynamic field values

use serde_json::{Map, Value};

/// All values of one form, keyed by field name
pub type Values = Map<String, Value>;

/// Whether a value counts as "no input" for rule purposes.
///
/// Null (also what a missing field reads as), the empty string and the
/// empty array are empty. `0`, `false` and `{}` are not.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Length used by min/max rules: characters for strings, items for arrays
pub fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Text a pattern is tested against; scalars are coerced to their string form
pub fn pattern_subject(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Turn a JSON object into a `Values` map; anything else yields an empty map
pub fn into_values(value: Value) -> Values {
    match value {
        Value::Object(map) => map,
        _ => Values::new(),
    }
}
