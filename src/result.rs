//! Evaluation results: the outcome of comparing expected vs. observed
//! actions for one task execution.
//!
//! `run_id` groups every result produced by one harness invocation;
//! `session_id` identifies the single task execution a result describes.
//! Results serialize to the flat payload shape so the store can persist
//! them as `(session_id, run_id, blob)` rows; serialized action entries
//! inside a result are JSON-encoded into string slots.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::action::payload::{self, payload_from_json, payload_to_json, Payload, PayloadValue, TYPE_KEY};
use crate::action::{Action, ActionRegistry, SearchAction};
use crate::error::ActionError;

/// Payload discriminator for agent results.
pub const AGENT_RESULT_TAG: &str = "agent_eval_result";
/// Payload discriminator for tool results.
pub const TOOL_RESULT_TAG: &str = "tool_eval_result";
/// Payload discriminator for symbol-search results.
pub const SYMBOL_SEARCH_RESULT_TAG: &str = "symbol_search_eval_result";

/// Ranked-window size for symbol-search partial matching.
pub const TOP_K: usize = 10;

/// Sentinel standing in for an absent search result.
pub const NO_RESULT: &str = "None";

/// Generates a fresh run identifier.
pub(crate) fn fresh_run_id() -> String {
    format!("run-{}", Uuid::new_v4())
}

/// The outcome of one evaluator (or one aggregation) against one task
/// execution.
#[derive(Debug, Clone)]
pub enum EvalResult {
    /// General chat-message-derived matching.
    Agent(AgentEvalResult),
    /// One expected tool call against one (optional) observed call.
    Tool(ToolEvalResult),
    /// Position-aware symbol-search comparison.
    SymbolSearch(SymbolSearchEvalResult),
}

/// General expected-vs-observed matching over a whole conversation.
#[derive(Debug, Clone)]
pub struct AgentEvalResult {
    /// Groups all results from one harness invocation.
    pub run_id: String,
    /// Identifies the task execution this result describes.
    pub session_id: String,
    /// For each expected action: was a value-equal action observed.
    pub match_results: HashMap<Action, bool>,
    /// Observed actions with no expected counterpart, in discovery order,
    /// duplicates preserved.
    pub extra_actions: Vec<Action>,
    /// When the result was produced.
    pub created_at: DateTime<Utc>,
}

impl AgentEvalResult {
    /// Creates a new agent result, generating a run id if none is given.
    pub fn new(
        match_results: HashMap<Action, bool>,
        extra_actions: Vec<Action>,
        session_id: impl Into<String>,
        run_id: Option<&str>,
    ) -> Self {
        Self {
            run_id: run_id.map(str::to_string).unwrap_or_else(fresh_run_id),
            session_id: session_id.into(),
            match_results,
            extra_actions,
            created_at: Utc::now(),
        }
    }

    /// True iff every expected action was observed.
    pub fn is_full_match(&self) -> bool {
        self.match_results.values().all(|&matched| matched)
    }

    /// True iff at least one expected action was observed.
    pub fn is_partial_match(&self) -> bool {
        self.match_results.values().any(|&matched| matched)
    }
}

/// Result of a 1:1 tool-call comparison.
#[derive(Debug, Clone)]
pub struct ToolEvalResult {
    pub run_id: String,
    pub session_id: String,
    /// The single expected action, if any.
    pub expected_action: Option<Action>,
    /// The single observed action, if any.
    pub observed_action: Option<Action>,
    pub created_at: DateTime<Utc>,
}

impl ToolEvalResult {
    /// Creates a new tool result, generating a run id if none is given.
    pub fn new(
        expected_action: Option<Action>,
        observed_action: Option<Action>,
        session_id: impl Into<String>,
        run_id: Option<&str>,
    ) -> Self {
        Self {
            run_id: run_id.map(str::to_string).unwrap_or_else(fresh_run_id),
            session_id: session_id.into(),
            expected_action,
            observed_action,
            created_at: Utc::now(),
        }
    }

    /// True iff expected and observed are value-equal.
    pub fn is_full_match(&self) -> bool {
        self.expected_action == self.observed_action
    }

    /// True on a full match, or when no action was expected at all.
    ///
    /// The absent-expectation case trivially "partially" matching is a
    /// long-standing quirk of this result kind; callers rely on it, so it
    /// is pinned by test rather than changed.
    pub fn is_partial_match(&self) -> bool {
        self.is_full_match() || self.expected_action.is_none()
    }
}

/// Position-aware comparison of one expected search against one observed
/// search.
#[derive(Debug, Clone)]
pub struct SymbolSearchEvalResult {
    pub run_id: String,
    pub session_id: String,
    /// The expected search, if any.
    pub expected_action: Option<SearchAction>,
    /// The observed search, if any.
    pub observed_action: Option<SearchAction>,
    pub created_at: DateTime<Utc>,
}

impl SymbolSearchEvalResult {
    /// Creates a new symbol-search result, generating a run id if none is
    /// given.
    pub fn new(
        expected_action: Option<SearchAction>,
        observed_action: Option<SearchAction>,
        session_id: impl Into<String>,
        run_id: Option<&str>,
    ) -> Self {
        Self {
            run_id: run_id.map(str::to_string).unwrap_or_else(fresh_run_id),
            session_id: session_id.into(),
            expected_action,
            observed_action,
            created_at: Utc::now(),
        }
    }

    /// The observed first-ranked result, or the sentinel.
    pub fn top_match(&self) -> String {
        self.observed_action
            .as_ref()
            .and_then(|a| a.search_results.first().cloned())
            .unwrap_or_else(|| NO_RESULT.to_string())
    }

    /// The observed first `TOP_K` results, right-padded with the sentinel
    /// to exactly `TOP_K` entries.
    pub fn top_k_matches(&self) -> Vec<String> {
        let mut matches: Vec<String> = self
            .observed_action
            .as_ref()
            .map(|a| a.search_results.iter().take(TOP_K).cloned().collect())
            .unwrap_or_default();
        matches.resize(TOP_K, NO_RESULT.to_string());
        matches
    }

    /// The expected first-ranked result, or the sentinel.
    pub fn expected_match(&self) -> String {
        self.expected_action
            .as_ref()
            .and_then(|a| a.search_results.first().cloned())
            .unwrap_or_else(|| NO_RESULT.to_string())
    }

    /// Position-0 exact match.
    pub fn is_full_match(&self) -> bool {
        self.expected_match() == self.top_match()
    }

    /// True iff an observed action exists and the expected top result
    /// appears anywhere in the observed top-K window.
    pub fn is_partial_match(&self) -> bool {
        self.observed_action.is_some() && self.top_k_matches().contains(&self.expected_match())
    }
}

impl EvalResult {
    /// Returns the payload discriminator for this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            EvalResult::Agent(_) => AGENT_RESULT_TAG,
            EvalResult::Tool(_) => TOOL_RESULT_TAG,
            EvalResult::SymbolSearch(_) => SYMBOL_SEARCH_RESULT_TAG,
        }
    }

    /// Run identifier shared across one harness invocation.
    pub fn run_id(&self) -> &str {
        match self {
            EvalResult::Agent(r) => &r.run_id,
            EvalResult::Tool(r) => &r.run_id,
            EvalResult::SymbolSearch(r) => &r.run_id,
        }
    }

    /// Session identifier of the underlying task execution.
    pub fn session_id(&self) -> &str {
        match self {
            EvalResult::Agent(r) => &r.session_id,
            EvalResult::Tool(r) => &r.session_id,
            EvalResult::SymbolSearch(r) => &r.session_id,
        }
    }

    /// When the result was produced.
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            EvalResult::Agent(r) => r.created_at,
            EvalResult::Tool(r) => r.created_at,
            EvalResult::SymbolSearch(r) => r.created_at,
        }
    }

    /// True iff every expected action was observed (variant semantics).
    pub fn is_full_match(&self) -> bool {
        match self {
            EvalResult::Agent(r) => r.is_full_match(),
            EvalResult::Tool(r) => r.is_full_match(),
            EvalResult::SymbolSearch(r) => r.is_full_match(),
        }
    }

    /// True iff at least one expected action matched (variant semantics).
    pub fn is_partial_match(&self) -> bool {
        match self {
            EvalResult::Agent(r) => r.is_partial_match(),
            EvalResult::Tool(r) => r.is_partial_match(),
            EvalResult::SymbolSearch(r) => r.is_partial_match(),
        }
    }

    /// Per-expected-action match entries, synthesized for the 1:1
    /// variants so the metrics engine can treat all results uniformly.
    pub fn match_results(&self) -> HashMap<Action, bool> {
        match self {
            EvalResult::Agent(r) => r.match_results.clone(),
            EvalResult::Tool(r) => r
                .expected_action
                .iter()
                .map(|a| (a.clone(), r.is_full_match()))
                .collect(),
            EvalResult::SymbolSearch(r) => r
                .expected_action
                .iter()
                .map(|a| (Action::Search(a.clone()), r.is_full_match()))
                .collect(),
        }
    }

    /// Observed actions with no expected counterpart.
    pub fn extra_actions(&self) -> Vec<Action> {
        match self {
            EvalResult::Agent(r) => r.extra_actions.clone(),
            EvalResult::Tool(r) => match (&r.observed_action, r.is_full_match()) {
                (Some(observed), false) => vec![observed.clone()],
                _ => Vec::new(),
            },
            EvalResult::SymbolSearch(r) => match (&r.observed_action, r.is_full_match()) {
                (Some(observed), false) => vec![Action::Search(observed.clone())],
                _ => Vec::new(),
            },
        }
    }

    /// Serializes the result to payload form.
    pub fn to_payload(&self) -> Payload {
        let mut p = Payload::new();
        p.insert(TYPE_KEY.to_string(), self.type_tag().into());
        p.insert("run_id".to_string(), self.run_id().into());
        p.insert("session_id".to_string(), self.session_id().into());

        p.insert(
            "created_at".to_string(),
            self.created_at().to_rfc3339().into(),
        );

        match self {
            EvalResult::Agent(r) => {
                let entries: Vec<String> = r
                    .match_results
                    .iter()
                    .map(|(action, matched)| encode_match_entry(action, *matched))
                    .collect();
                p.insert("match_results".to_string(), PayloadValue::List(entries));

                let extras: Vec<String> =
                    r.extra_actions.iter().map(encode_action).collect();
                p.insert("extra_actions".to_string(), PayloadValue::List(extras));
            }
            EvalResult::Tool(r) => {
                if let Some(expected) = &r.expected_action {
                    p.insert("expected_action".to_string(), encode_action(expected).into());
                }
                if let Some(observed) = &r.observed_action {
                    p.insert("observed_action".to_string(), encode_action(observed).into());
                }
            }
            EvalResult::SymbolSearch(r) => {
                if let Some(expected) = &r.expected_action {
                    let action = Action::Search(expected.clone());
                    p.insert("expected_action".to_string(), encode_action(&action).into());
                }
                if let Some(observed) = &r.observed_action {
                    let action = Action::Search(observed.clone());
                    p.insert("observed_action".to_string(), encode_action(&action).into());
                }
            }
        }

        p
    }

    /// Deserializes a result from payload form.
    pub fn from_payload(p: &Payload, registry: &ActionRegistry) -> Result<Self, ActionError> {
        let type_tag = payload::get_str(p, TYPE_KEY)?;
        let run_id = payload::get_str(p, "run_id")?.to_string();
        let session_id = payload::get_str(p, "session_id")?.to_string();
        let created_at = DateTime::parse_from_rfc3339(payload::get_str(p, "created_at")?)
            .map_err(|e| ActionError::malformed("created_at", format!("not RFC 3339: {e}")))?
            .with_timezone(&Utc);

        match type_tag {
            AGENT_RESULT_TAG => {
                let mut match_results = HashMap::new();
                for entry in payload::get_list(p, "match_results")? {
                    let (action, matched) = decode_match_entry(entry, registry)?;
                    match_results.insert(action, matched);
                }

                let mut extra_actions = Vec::new();
                for entry in payload::get_list(p, "extra_actions")? {
                    extra_actions.push(decode_action(entry, registry)?);
                }

                Ok(EvalResult::Agent(AgentEvalResult {
                    run_id,
                    session_id,
                    match_results,
                    extra_actions,
                    created_at,
                }))
            }
            TOOL_RESULT_TAG => {
                let expected_action = payload::opt_str(p, "expected_action")?
                    .map(|s| decode_action(s, registry))
                    .transpose()?;
                let observed_action = payload::opt_str(p, "observed_action")?
                    .map(|s| decode_action(s, registry))
                    .transpose()?;

                Ok(EvalResult::Tool(ToolEvalResult {
                    run_id,
                    session_id,
                    expected_action,
                    observed_action,
                    created_at,
                }))
            }
            SYMBOL_SEARCH_RESULT_TAG => {
                let expected_action = payload::opt_str(p, "expected_action")?
                    .map(|s| decode_search_action(s, registry))
                    .transpose()?;
                let observed_action = payload::opt_str(p, "observed_action")?
                    .map(|s| decode_search_action(s, registry))
                    .transpose()?;

                Ok(EvalResult::SymbolSearch(SymbolSearchEvalResult {
                    run_id,
                    session_id,
                    expected_action,
                    observed_action,
                    created_at,
                }))
            }
            other => Err(ActionError::UnknownActionType(other.to_string())),
        }
    }
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(session={}, run={}, full_match={}, partial_match={})",
            self.type_tag(),
            self.session_id(),
            self.run_id(),
            self.is_full_match(),
            self.is_partial_match()
        )
    }
}

/// JSON-encodes one `{action, matched}` match entry into a string slot.
fn encode_match_entry(action: &Action, matched: bool) -> String {
    let entry = json!({
        "action": payload_to_json(&action.to_payload()),
        "matched": matched,
    });
    serde_json::to_string(&entry).unwrap_or_else(|_| "null".to_string())
}

fn decode_match_entry(
    encoded: &str,
    registry: &ActionRegistry,
) -> Result<(Action, bool), ActionError> {
    let entry: serde_json::Value = serde_json::from_str(encoded)
        .map_err(|e| ActionError::malformed("match_results", format!("not valid JSON: {e}")))?;
    let matched = entry
        .get("matched")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| ActionError::malformed("match_results.matched", "expected a boolean"))?;
    let action_json = entry
        .get("action")
        .ok_or_else(|| ActionError::malformed("match_results.action", "missing required field"))?;
    let action = registry.parse_action_from_payload(&payload_from_json(action_json)?)?;
    Ok((action, matched))
}

/// JSON-encodes one action payload into a string slot.
fn encode_action(action: &Action) -> String {
    serde_json::to_string(&payload_to_json(&action.to_payload()))
        .unwrap_or_else(|_| "null".to_string())
}

fn decode_action(encoded: &str, registry: &ActionRegistry) -> Result<Action, ActionError> {
    let json: serde_json::Value = serde_json::from_str(encoded)
        .map_err(|e| ActionError::malformed("action", format!("not valid JSON: {e}")))?;
    registry.parse_action_from_payload(&payload_from_json(&json)?)
}

fn decode_search_action(
    encoded: &str,
    registry: &ActionRegistry,
) -> Result<SearchAction, ActionError> {
    match decode_action(encoded, registry)? {
        Action::Search(action) => Ok(action),
        other => Err(ActionError::malformed(
            "action",
            format!("expected a search action, got '{}'", other.type_tag()),
        )),
    }
}
