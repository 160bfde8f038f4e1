//! Payload: the flat, string-oriented serialization shape for actions
//! and results.
//!
//! A payload is a string-keyed map whose values are strings, lists of
//! strings, or nested payloads, and it always carries a `"type"`
//! discriminator. Structured values that do not fit this shape (the
//! code-writing bound value, serialized result entries) are JSON-encoded
//! into a single string slot; each such boundary is documented at the
//! call site.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ActionError;

/// Key carrying the variant discriminator in every action payload.
pub const TYPE_KEY: &str = "type";

/// A payload map. BTreeMap keeps serialization deterministic.
pub type Payload = BTreeMap<String, PayloadValue>;

/// One value slot in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// A plain string.
    Str(String),
    /// An ordered list of strings.
    List(Vec<String>),
    /// A nested payload.
    Map(Payload),
}

impl PayloadValue {
    /// Returns the string content, if this slot is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Str(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Str(s)
    }
}

/// Reads a required string field from a payload.
pub fn get_str<'a>(payload: &'a Payload, field: &str) -> Result<&'a str, ActionError> {
    match payload.get(field) {
        Some(PayloadValue::Str(s)) => Ok(s),
        Some(_) => Err(ActionError::malformed(field, "expected a string")),
        None => Err(ActionError::malformed(field, "missing required field")),
    }
}

/// Reads an optional string field. Present-but-mistyped is still an error.
pub fn opt_str<'a>(payload: &'a Payload, field: &str) -> Result<Option<&'a str>, ActionError> {
    match payload.get(field) {
        Some(PayloadValue::Str(s)) => Ok(Some(s)),
        Some(_) => Err(ActionError::malformed(field, "expected a string")),
        None => Ok(None),
    }
}

/// Reads a required list-of-strings field from a payload.
pub fn get_list<'a>(payload: &'a Payload, field: &str) -> Result<&'a [String], ActionError> {
    match payload.get(field) {
        Some(PayloadValue::List(items)) => Ok(items),
        Some(_) => Err(ActionError::malformed(field, "expected a list of strings")),
        None => Err(ActionError::malformed(field, "missing required field")),
    }
}

/// Reads a required nested-payload field from a payload.
pub fn get_map<'a>(payload: &'a Payload, field: &str) -> Result<&'a Payload, ActionError> {
    match payload.get(field) {
        Some(PayloadValue::Map(map)) => Ok(map),
        Some(_) => Err(ActionError::malformed(field, "expected a nested mapping")),
        None => Err(ActionError::malformed(field, "missing required field")),
    }
}

/// Converts a payload into a generic JSON value.
pub fn payload_to_json(payload: &Payload) -> Value {
    // PayloadValue serializes untagged, so this cannot produce anything
    // other than strings, string arrays and objects.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// Converts a JSON object into a payload.
///
/// Fails with an "invalid field type" error when the JSON carries values
/// outside the payload shape (numbers, booleans, mixed arrays).
pub fn payload_from_json(value: &Value) -> Result<Payload, ActionError> {
    let object = value
        .as_object()
        .ok_or_else(|| ActionError::malformed("<root>", "expected a JSON object"))?;

    let mut payload = Payload::new();
    for (key, val) in object {
        payload.insert(key.clone(), payload_value_from_json(key, val)?);
    }
    Ok(payload)
}

fn payload_value_from_json(field: &str, value: &Value) -> Result<PayloadValue, ActionError> {
    match value {
        Value::String(s) => Ok(PayloadValue::Str(s.clone())),
        Value::Array(items) => {
            let mut strings = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => strings.push(s.clone()),
                    _ => {
                        return Err(ActionError::malformed(
                            field,
                            "expected every list element to be a string",
                        ))
                    }
                }
            }
            Ok(PayloadValue::List(strings))
        }
        Value::Object(_) => Ok(PayloadValue::Map(payload_from_json(value)?)),
        _ => Err(ActionError::malformed(
            field,
            "expected a string, list of strings, or nested mapping",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Payload {
        let mut nested = Payload::new();
        nested.insert("x".to_string(), "1".into());

        let mut payload = Payload::new();
        payload.insert(TYPE_KEY.to_string(), "function_call".into());
        payload.insert("name".to_string(), "f".into());
        payload.insert("arguments".to_string(), PayloadValue::Map(nested));
        payload.insert(
            "tags".to_string(),
            PayloadValue::List(vec!["a".to_string(), "b".to_string()]),
        );
        payload
    }

    #[test]
    fn test_get_str() {
        let payload = sample_payload();
        assert_eq!(get_str(&payload, "name").unwrap(), "f");
        assert!(get_str(&payload, "missing").is_err());
        assert!(get_str(&payload, "arguments").is_err());
    }

    #[test]
    fn test_opt_str() {
        let payload = sample_payload();
        assert_eq!(opt_str(&payload, "name").unwrap(), Some("f"));
        assert_eq!(opt_str(&payload, "missing").unwrap(), None);
        assert!(opt_str(&payload, "tags").is_err());
    }

    #[test]
    fn test_get_list_and_map() {
        let payload = sample_payload();
        assert_eq!(get_list(&payload, "tags").unwrap().len(), 2);
        assert_eq!(get_map(&payload, "arguments").unwrap().len(), 1);
        assert!(get_list(&payload, "name").is_err());
        assert!(get_map(&payload, "tags").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let payload = sample_payload();
        let json = payload_to_json(&payload);
        let back = payload_from_json(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_payload_from_json_rejects_numbers() {
        let json = json!({"type": "search", "count": 3});
        let err = payload_from_json(&json).unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_payload_from_json_rejects_mixed_lists() {
        let json = json!({"results": ["a", 1]});
        assert!(payload_from_json(&json).is_err());
    }
}
