//! Error types for evalforge operations.
//!
//! Defines error types for all major subsystems:
//! - Action payload parsing and registry lookup
//! - Restricted script extraction and interpretation
//! - Evaluator contracts and result aggregation
//! - Result persistence
//! - Expected-action loading
//! - Harness batch execution

use thiserror::Error;

/// Boxed error used at the external-collaborator boundaries (task
/// executor, result store) where the concrete failure type is not ours.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing or registering action payloads.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown action type '{0}'")]
    UnknownActionType(String),

    #[error("Invalid field type for '{field}': {reason}")]
    MalformedPayload { field: String, reason: String },

    #[error("Action type '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ActionError {
    /// Shorthand for the "invalid field type" payload error.
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ActionError::MalformedPayload {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while extracting and interpreting an embedded code block.
///
/// `UnclosedCodeBlock` and `TargetVariableNotFound` are structural failures
/// that propagate to the caller. `Eval` failures are captured by the
/// code-writing evaluator as an error-carrying action instead.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Code block opened but never closed")]
    UnclosedCodeBlock,

    #[error("Script evaluation failed: {0}")]
    Eval(String),

    #[error("None of the target variables {0:?} were bound by the script")]
    TargetVariableNotFound(Vec<String>),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors raised by evaluators and result aggregation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("filter_actions is not supported on '{0}'")]
    UnsupportedFilter(&'static str),

    #[error("Evaluator '{evaluator}' returned a {actual} result, expected {expected}")]
    InvalidEvaluatorResult {
        evaluator: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot aggregate an empty result list")]
    EmptyAggregation,

    #[error("Results disagree on {field}: '{left}' vs '{right}'")]
    InconsistentSession {
        field: String,
        left: String,
        right: String,
    },

    #[error("Duplicate evaluator type '{0}'")]
    DuplicateEvaluatorType(String),

    #[error("Malformed message content: {0}")]
    MalformedMessage(String),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Task execution failed: {0}")]
    Execution(#[source] BoxError),
}

/// Errors that can occur during result persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("get_results requires at least one of session_id or run_id")]
    MissingFilter,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors that can occur while loading expected-action documents.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid expected-action document at index {index}: {reason}")]
    InvalidDocument { index: usize, reason: String },

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors raised by the evaluation harness.
///
/// Any failure while processing a task (executor call, evaluator run,
/// result persistence) aborts the whole batch wrapped in
/// `ExecutionFailed`, preserving the original cause.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Evaluation failed for task '{task_id}': {source}")]
    ExecutionFailed {
        task_id: String,
        #[source]
        source: BoxError,
    },
}
