//! Helpers over the generic [`serde_yaml::Value`] tree.

use serde_yaml::{Mapping, Value};

use crate::error::TypeError;

/// Key under which references are stored.
pub const REF_KEY: &str = "$ref";

/// Returns the textual form of a mapping key.
///
/// Scalar keys are rendered the way they read in the document (`200`,
/// `true`, `null`); mapping and sequence keys have no textual form.
pub fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Tagged(tagged) => key_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Looks up `key` in `map`, matching non-string keys by their text.
pub fn lookup<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| !k.is_string() && key_text(k).as_deref() == Some(key))
            .map(|(_, v)| v)
    })
}

/// Lists `(key, value)` pairs with textual keys, in mapping order.
///
/// # Errors
///
/// Returns [`TypeError::UnsupportedKey`] when a key is a mapping or a
/// sequence; `location` names the mapping in the message.
pub fn entries<'a>(map: &'a Mapping, location: &str) -> Result<Vec<(String, &'a Value)>, TypeError> {
    map.iter()
        .map(|(k, v)| {
            key_text(k).map(|text| (text, v)).ok_or_else(|| TypeError::UnsupportedKey {
                location: location.to_string(),
            })
        })
        .collect()
}

/// Returns the string stored under `$ref` when `value` is a mapping with one.
///
/// # Errors
///
/// Returns [`TypeError::NonStringReference`] when `$ref` holds anything
/// other than a string.
pub fn reference_of<'a>(value: &'a Value, location: &str) -> Result<Option<&'a str>, TypeError> {
    let Value::Mapping(map) = value else {
        return Ok(None);
    };
    match map.get(REF_KEY) {
        None => Ok(None),
        Some(Value::String(raw)) => Ok(Some(raw.as_str())),
        Some(_) => Err(TypeError::NonStringReference {
            location: location.to_string(),
        }),
    }
}

/// Collects every `$ref` string in the tree that does not start with `#`.
///
/// # Examples
///
/// ```
/// use openapi_merge_core::external_references;
///
/// let doc: serde_yaml::Value = serde_yaml::from_str(
///     "a:\n  $ref: '#/components/schemas/A'\nb:\n  - $ref: other.yaml#/B\n",
/// ).unwrap();
/// assert_eq!(external_references(&doc), vec!["other.yaml#/B".to_string()]);
/// ```
pub fn external_references(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_external(value, &mut found);
    found
}

fn collect_external(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    (Some(REF_KEY), Value::String(raw)) if !raw.starts_with('#') => {
                        found.push(raw.clone());
                    }
                    _ => collect_external(child, found),
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| collect_external(item, found)),
        Value::Tagged(tagged) => collect_external(&tagged.value, found),
        _ => {}
    }
}
