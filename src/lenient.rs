//! Forgiving field decoders for provider payloads.
//!
//! Used with `#[serde(default, deserialize_with = "...")]`. A field whose
//! shape is unexpected decodes to `None` or an empty list, so one odd item
//! never fails the whole page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Scalar text from a string, a number, an Elsevier `{"$": ..}` wrapper, or
/// the first array element that yields text.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$").and_then(text),
        Value::Array(items) => items.iter().find_map(text),
        _ => None,
    }
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(&Value::deserialize(deserializer)?))
}

/// A list of strings; a bare scalar becomes a one-element list.
pub(crate) fn strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(&other).into_iter().collect(),
    })
}

/// A list of `T`, skipping elements that do not decode. A single object
/// becomes a one-element list.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Value::Null => Vec::new(),
        single => serde_json::from_value(single).ok().into_iter().collect(),
    })
}

/// `Some(T)` if the value decodes, `None` otherwise.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}
