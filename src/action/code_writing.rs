//! Code-writing actions: the value an agent bound to a designated
//! variable inside an embedded code block.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::payload::{self, Payload, TYPE_KEY};
use super::registry::ActionRegistry;
use super::Action;
use crate::error::ActionError;
use crate::script::ScriptValue;

/// Payload discriminator for code-writing actions.
pub const TYPE_TAG: &str = "code_writing";

/// The value bound to a target variable after interpreting an agent's
/// code block, or the error that prevented it.
///
/// Identity is the bound value alone: the `error` field is metadata and
/// takes no part in equality or hashing. An error-carrying action is
/// therefore never equal to a value-carrying one, which is how extraction
/// failures surface as mismatches instead of exceptions.
#[derive(Debug, Clone)]
pub struct CodeWritingAction {
    /// The bound value. `None` when interpretation failed.
    pub value: Option<ScriptValue>,
    /// Error string when interpretation failed.
    pub error: Option<String>,
}

impl CodeWritingAction {
    /// Creates an action carrying a bound value.
    pub fn from_value(value: ScriptValue) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    /// Creates an action carrying an interpretation error.
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
        }
    }

    /// Serializes to payload form.
    ///
    /// The bound value is a structured value, which the flat payload
    /// shape cannot hold directly; it is JSON-encoded into the `"value"`
    /// string slot.
    pub fn to_payload(&self) -> Payload {
        let mut p = Payload::new();
        p.insert(TYPE_KEY.to_string(), TYPE_TAG.into());
        if let Some(value) = &self.value {
            let encoded = serde_json::to_string(&value.to_json())
                .unwrap_or_else(|_| "null".to_string());
            p.insert("value".to_string(), encoded.into());
        }
        if let Some(error) = &self.error {
            p.insert("error".to_string(), error.clone().into());
        }
        p
    }

    /// Deserializes from payload form.
    pub fn from_payload(p: &Payload, registry: &ActionRegistry) -> Result<Action, ActionError> {
        let value = match payload::opt_str(p, "value")? {
            Some(encoded) => {
                let json: serde_json::Value = serde_json::from_str(encoded).map_err(|e| {
                    ActionError::malformed("value", format!("not valid JSON: {e}"))
                })?;
                Some(ScriptValue::from_json(&json, registry)?)
            }
            None => None,
        };
        let error = payload::opt_str(p, "error")?.map(str::to_string);

        if value.is_none() && error.is_none() {
            return Err(ActionError::malformed(
                "value",
                "code_writing payload carries neither a value nor an error",
            ));
        }

        Ok(Action::CodeWriting(Self { value, error }))
    }
}

impl PartialEq for CodeWritingAction {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for CodeWritingAction {}

impl Hash for CodeWritingAction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for CodeWritingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.error) {
            (Some(value), _) => write!(f, "code_writing(value={})", value.to_json()),
            (None, Some(error)) => write!(f, "code_writing(error={error})"),
            (None, None) => write!(f, "code_writing()"),
        }
    }
}
