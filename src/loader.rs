//! Loading expected-action sets from templated JSON documents.
//!
//! An expected-action document is a JSON array of entries, each carrying
//! an action payload `template` plus an optional list of `formatters`
//! (alias `entries`): string-keyed substitution maps applied to every
//! string leaf of the template, producing one action per formatter.

use serde_json::Value;

use crate::action::payload::payload_from_json;
use crate::action::{Action, ActionRegistry};
use crate::error::LoaderError;

/// Parses an expected-action document into a flat, ordered action list.
///
/// Each document entry expands to one action per formatter, in formatter
/// order; an entry without formatters yields its template as-is. Unknown
/// `{placeholder}` markers are left intact rather than rejected, so a
/// template can carry literal braces the formatter does not touch.
pub fn load_expected_actions(
    json: &str,
    registry: &ActionRegistry,
) -> Result<Vec<Action>, LoaderError> {
    let document: Value = serde_json::from_str(json)?;
    let entries = document.as_array().ok_or_else(|| LoaderError::InvalidDocument {
        index: 0,
        reason: "document root must be a JSON array".to_string(),
    })?;

    let mut actions = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let template = entry.get("template").ok_or_else(|| {
            LoaderError::InvalidDocument {
                index,
                reason: "missing 'template' field".to_string(),
            }
        })?;

        let formatters = match entry.get("formatters").or_else(|| entry.get("entries")) {
            Some(value) => Some(value.as_array().ok_or_else(|| {
                LoaderError::InvalidDocument {
                    index,
                    reason: "'formatters' must be a JSON array".to_string(),
                }
            })?),
            None => None,
        };

        match formatters {
            None => actions.push(parse_template(template, registry)?),
            Some(formatters) => {
                for formatter in formatters {
                    let substitutions = formatter.as_object().ok_or_else(|| {
                        LoaderError::InvalidDocument {
                            index,
                            reason: "each formatter must be a JSON object".to_string(),
                        }
                    })?;
                    let resolved = substitute(template, substitutions);
                    actions.push(parse_template(&resolved, registry)?);
                }
            }
        }
    }
    Ok(actions)
}

fn parse_template(template: &Value, registry: &ActionRegistry) -> Result<Action, LoaderError> {
    let payload = payload_from_json(template)?;
    Ok(registry.parse_action_from_payload(&payload)?)
}

/// Applies `{key}` substitution to every string leaf of a template.
fn substitute(template: &Value, substitutions: &serde_json::Map<String, Value>) -> Value {
    match template {
        Value::String(s) => {
            let mut resolved = s.clone();
            for (key, value) in substitutions {
                resolved = resolved.replace(&format!("{{{key}}}"), &render(value));
            }
            Value::String(resolved)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, substitutions))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, substitutions)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Renders a substitution value the way it would read inline: strings
/// unquoted, everything else in its JSON form.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
