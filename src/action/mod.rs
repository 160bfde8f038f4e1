//! Action model: discrete, comparable units of agent behavior.
//!
//! An action is either observed (extracted from a conversation message by
//! an evaluator) or expected (deserialized from a stored payload). Actions
//! use value equality: two actions are equal iff their semantically
//! relevant fields match, and they hash over those same fields so they can
//! key a match map. Every variant round-trips through the flat string
//! [`Payload`](payload::Payload) shape via a `"type"` discriminator.

pub mod code_writing;
pub mod function_call;
pub mod payload;
pub mod registry;
pub mod search;

use std::fmt;

pub use code_writing::CodeWritingAction;
pub use function_call::FunctionCallAction;
pub use payload::{Payload, PayloadValue, TYPE_KEY};
pub use registry::ActionRegistry;
pub use search::SearchAction;

/// A discrete unit of agent behavior. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// A structured function/tool call.
    FunctionCall(FunctionCallAction),
    /// A value bound by a code block the agent wrote.
    CodeWriting(CodeWritingAction),
    /// A search invocation with its ranked results.
    Search(SearchAction),
}

impl Action {
    /// Returns the payload type tag for this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Action::FunctionCall(_) => function_call::TYPE_TAG,
            Action::CodeWriting(_) => code_writing::TYPE_TAG,
            Action::Search(_) => search::TYPE_TAG,
        }
    }

    /// Serializes the action to its payload form.
    pub fn to_payload(&self) -> Payload {
        match self {
            Action::FunctionCall(a) => a.to_payload(),
            Action::CodeWriting(a) => a.to_payload(),
            Action::Search(a) => a.to_payload(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::FunctionCall(a) => a.fmt(f),
            Action::CodeWriting(a) => a.fmt(f),
            Action::Search(a) => a.fmt(f),
        }
    }
}

impl From<FunctionCallAction> for Action {
    fn from(a: FunctionCallAction) -> Self {
        Action::FunctionCall(a)
    }
}

impl From<CodeWritingAction> for Action {
    fn from(a: CodeWritingAction) -> Self {
        Action::CodeWriting(a)
    }
}

impl From<SearchAction> for Action {
    fn from(a: SearchAction) -> Self {
        Action::Search(a)
    }
}
