//! Function-call actions: a named call with a string argument map.

use std::collections::BTreeMap;
use std::fmt;

use super::payload::{self, Payload, PayloadValue, TYPE_KEY};
use super::registry::ActionRegistry;
use super::Action;
use crate::error::ActionError;

/// Payload discriminator for function-call actions.
pub const TYPE_TAG: &str = "function_call";

/// A structured function/tool call made by the agent.
///
/// Equality requires the exact name and the full argument map; there is
/// no partial matching of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCallAction {
    /// Name of the function that was called.
    pub name: String,
    /// Arguments passed to the call. BTreeMap keeps hashing and payload
    /// output deterministic.
    pub arguments: BTreeMap<String, String>,
}

impl FunctionCallAction {
    /// Creates a new function-call action.
    pub fn new<I, K, V>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Serializes to payload form.
    pub fn to_payload(&self) -> Payload {
        let arguments: Payload = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), PayloadValue::Str(v.clone())))
            .collect();

        let mut p = Payload::new();
        p.insert(TYPE_KEY.to_string(), TYPE_TAG.into());
        p.insert("name".to_string(), self.name.clone().into());
        p.insert("arguments".to_string(), PayloadValue::Map(arguments));
        p
    }

    /// Deserializes from payload form.
    pub fn from_payload(p: &Payload, _registry: &ActionRegistry) -> Result<Action, ActionError> {
        let name = payload::get_str(p, "name")?.to_string();

        let mut arguments = BTreeMap::new();
        for (key, value) in payload::get_map(p, "arguments")? {
            match value {
                PayloadValue::Str(s) => {
                    arguments.insert(key.clone(), s.clone());
                }
                _ => {
                    return Err(ActionError::malformed(
                        format!("arguments.{key}"),
                        "expected a string argument value",
                    ))
                }
            }
        }

        Ok(Action::FunctionCall(Self { name, arguments }))
    }
}

impl fmt::Display for FunctionCallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}
