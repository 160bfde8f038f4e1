//! Restricted script handling for code-writing evaluation.
//!
//! Agent messages may embed a fenced code block that binds result
//! variables. Running agent-produced text as real code is a security
//! decision this crate refuses to make implicitly: instead of executing
//! the snippet, a restricted interpreter accepts only top-level
//! `name = <literal>` assignments, where the literal is a JSON-style
//! value extended with Python's `True`/`False`/`None` and single-quoted
//! strings. Anything beyond that subset is a script evaluation error,
//! which the code-writing evaluator captures as an error-carrying action
//! the same way a runtime exception would be.
//!
//! Structural failures are different: an opened-but-never-closed fence
//! propagates as [`ScriptError::UnclosedCodeBlock`], since that is a
//! defect in the message markup rather than in the script.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Value;

use crate::action::payload::{payload_from_json, payload_to_json};
use crate::action::{Action, ActionRegistry};
use crate::error::{ActionError, ScriptError};

/// Wrapper key marking a nested action inside a serialized script value.
/// Map keys starting with `$` are reserved for this encoding.
const ACTION_WRAPPER_KEY: &str = "$action";

/// A structured value bound by a script.
///
/// Hashable so that actions carrying one can key a match map; numbers use
/// `OrderedFloat` for that reason. Values may nest actions, which makes
/// code-writing actions composable with the rest of the action model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    Str(String),
    List(Vec<ScriptValue>),
    Map(BTreeMap<String, ScriptValue>),
    Action(Box<Action>),
}

impl ScriptValue {
    /// Converts to a generic JSON value. Nested actions are wrapped as
    /// `{"$action": <payload>}`. JSON cannot carry non-finite numbers;
    /// those become null.
    pub fn to_json(&self) -> Value {
        match self {
            ScriptValue::Null => Value::Null,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Number(n) => serde_json::Number::from_f64(n.into_inner())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ScriptValue::Str(s) => Value::String(s.clone()),
            ScriptValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ScriptValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            ScriptValue::Action(action) => {
                let mut wrapper = serde_json::Map::new();
                wrapper.insert(
                    ACTION_WRAPPER_KEY.to_string(),
                    payload_to_json(&action.to_payload()),
                );
                Value::Object(wrapper)
            }
        }
    }

    /// Inverse of [`to_json`](Self::to_json). Needs the registry to decode
    /// nested `{"$action": ...}` wrappers.
    pub fn from_json(value: &Value, registry: &ActionRegistry) -> Result<Self, ActionError> {
        match value {
            Value::Null => Ok(ScriptValue::Null),
            Value::Bool(b) => Ok(ScriptValue::Bool(*b)),
            Value::Number(n) => {
                let f = n.as_f64().ok_or_else(|| {
                    ActionError::malformed("value", "number out of f64 range")
                })?;
                Ok(ScriptValue::Number(OrderedFloat(f)))
            }
            Value::String(s) => Ok(ScriptValue::Str(s.clone())),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(Self::from_json(item, registry)?);
                }
                Ok(ScriptValue::List(list))
            }
            Value::Object(object) => {
                if object.len() == 1 {
                    if let Some(inner) = object.get(ACTION_WRAPPER_KEY) {
                        let payload = payload_from_json(inner)?;
                        let action = registry.parse_action_from_payload(&payload)?;
                        return Ok(ScriptValue::Action(Box::new(action)));
                    }
                }
                let mut map = BTreeMap::new();
                for (k, v) in object {
                    map.insert(k.clone(), Self::from_json(v, registry)?);
                }
                Ok(ScriptValue::Map(map))
            }
        }
    }
}

/// Extracts the first fenced code block tagged with `language`.
///
/// Returns `Ok(None)` when the message has no such block (the normal
/// case), the block body when it does, and `UnclosedCodeBlock` when the
/// opening fence has no closing fence.
pub fn extract_code_block(content: &str, language: &str) -> Result<Option<String>, ScriptError> {
    let open_re = Regex::new(&format!(r"(?m)^```{}[ \t]*\r?$", regex::escape(language)))?;
    let open = match open_re.find(content) {
        Some(m) => m,
        None => return Ok(None),
    };

    let after = &content[open.end()..];
    let after = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);

    let close_re = Regex::new(r"(?m)^```[ \t]*\r?$")?;
    match close_re.find(after) {
        Some(close) => Ok(Some(
            after[..close.start()]
                .trim_end_matches(['\n', '\r'])
                .to_string(),
        )),
        None => Err(ScriptError::UnclosedCodeBlock),
    }
}

/// Interprets a script in an isolated scope and returns its top-level
/// bindings. Only `name = <literal>` assignments are accepted.
pub fn run_script(source: &str) -> Result<BTreeMap<String, ScriptValue>, ScriptError> {
    let mut bindings = BTreeMap::new();
    for statement in split_statements(source)? {
        let (name, expr) = split_assignment(&statement)?;
        bindings.insert(name, parse_literal(&expr)?);
    }
    Ok(bindings)
}

/// Splits a script into logical statements, joining physical lines while
/// brackets remain open.
fn split_statements(source: &str) -> Result<Vec<String>, ScriptError> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut depth: i32 = 0;

    for line in source.lines() {
        let trimmed = line.trim();
        if buffer.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }

        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(line);

        let (line_depth, ends_in_string) = scan_brackets(&buffer);
        if ends_in_string {
            return Err(ScriptError::Eval(format!(
                "unterminated string literal in: {}",
                trimmed
            )));
        }
        depth = line_depth;

        if depth <= 0 {
            statements.push(std::mem::take(&mut buffer));
            depth = 0;
        }
    }

    if !buffer.trim().is_empty() {
        return Err(ScriptError::Eval(
            "unexpected end of script inside a bracketed expression".to_string(),
        ));
    }

    Ok(statements)
}

/// Returns the open-bracket depth of `s` and whether it ends inside a
/// string literal. String-aware, handles both quote styles and escapes.
fn scan_brackets(s: &str) -> (i32, bool) {
    let mut depth = 0;
    let mut in_string = false;
    let mut quote = '"';
    let mut escape = false;

    for c in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                _ if c == quote => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = true;
                quote = c;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }

    (depth, in_string)
}

/// Splits `name = expr` at the first top-level assignment operator.
fn split_assignment(statement: &str) -> Result<(String, String), ScriptError> {
    let bytes = statement.as_bytes();
    let mut in_string = false;
    let mut quote = b'"';
    let mut escape = false;
    let mut depth: i32 = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match b {
                b'\\' => escape = true,
                _ if b == quote => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' | b'\'' => {
                in_string = true;
                quote = b;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                // Skip comparison operators (==, !=, <=, >=).
                let next_is_eq = bytes.get(i + 1) == Some(&b'=');
                let prev_is_cmp = i > 0 && matches!(bytes[i - 1], b'!' | b'<' | b'>' | b'=');
                if next_is_eq || prev_is_cmp {
                    continue;
                }

                let name = statement[..i].trim().to_string();
                let expr = statement[i + 1..].trim().to_string();

                let ident_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?;
                if !ident_re.is_match(&name) {
                    return Err(ScriptError::Eval(format!(
                        "assignment target '{}' is not a simple identifier",
                        name
                    )));
                }
                if expr.is_empty() {
                    return Err(ScriptError::Eval(format!(
                        "assignment to '{}' has no right-hand side",
                        name
                    )));
                }
                return Ok((name, expr));
            }
            _ => {}
        }
    }

    Err(ScriptError::Eval(format!(
        "unsupported statement (only `name = <literal>` is allowed): {}",
        statement.trim()
    )))
}

/// Parses the right-hand side of an assignment as a literal value.
fn parse_literal(expr: &str) -> Result<ScriptValue, ScriptError> {
    let normalized = normalize_literal(expr)?;
    let value: Value = serde_json::from_str(&normalized)
        .map_err(|e| ScriptError::Eval(format!("invalid literal `{}`: {}", expr, e)))?;
    Ok(plain_script_value(&value))
}

/// Converts a JSON value to a ScriptValue without action-wrapper
/// interpretation; script literals cannot spell nested actions.
fn plain_script_value(value: &Value) -> ScriptValue {
    match value {
        Value::Null => ScriptValue::Null,
        Value::Bool(b) => ScriptValue::Bool(*b),
        Value::Number(n) => ScriptValue::Number(OrderedFloat(n.as_f64().unwrap_or(0.0))),
        Value::String(s) => ScriptValue::Str(s.clone()),
        Value::Array(items) => ScriptValue::List(items.iter().map(plain_script_value).collect()),
        Value::Object(object) => ScriptValue::Map(
            object
                .iter()
                .map(|(k, v)| (k.clone(), plain_script_value(v)))
                .collect(),
        ),
    }
}

/// Rewrites a Python-style literal into strict JSON: single-quoted
/// strings become double-quoted, and `True`/`False`/`None` become their
/// JSON spellings. Any other bare word is an unsupported expression.
fn normalize_literal(expr: &str) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(expr.len());
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i = copy_string(&chars, i, c, &mut out)?;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                // Part of a number suffix like `1e5` stays untouched.
                let prev = if i > 0 { Some(chars[i - 1]) } else { None };
                if matches!(prev, Some(p) if p.is_ascii_digit() || p == '.') {
                    out.push(c);
                    i += 1;
                    continue;
                }

                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    "true" | "false" | "null" => out.push_str(&word),
                    _ => {
                        return Err(ScriptError::Eval(format!(
                            "unsupported expression token '{}'",
                            word
                        )))
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Copies a string literal starting at `start` (whose quote char is
/// `quote`) into `out` as a JSON double-quoted string. Returns the index
/// past the closing quote.
fn copy_string(
    chars: &[char],
    start: usize,
    quote: char,
    out: &mut String,
) -> Result<usize, ScriptError> {
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                Some('\'') => {
                    // JSON has no \' escape; the bare quote is fine.
                    out.push('\'');
                    i += 2;
                }
                Some(next) => {
                    out.push('\\');
                    out.push(*next);
                    i += 2;
                }
                None => return Err(ScriptError::Eval("dangling escape in string".to_string())),
            }
            continue;
        }
        if c == quote {
            out.push('"');
            return Ok(i + 1);
        }
        if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
        i += 1;
    }

    Err(ScriptError::Eval("unterminated string literal".to_string()))
}
