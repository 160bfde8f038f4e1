//! Tasks, conversations and the executor boundary.
//!
//! The agent runtime itself lives outside this crate. The core only needs
//! a finished, ordered conversation per task, obtained through the
//! [`TaskExecutor`] trait. Task status is owned by the runtime that
//! produces tasks; this crate (executor boundary included, which sees
//! tasks immutably) only reads it and never drives the state machine.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// An agent task to evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier.
    pub id: String,
    /// Instruction given to the agent.
    pub instruction: String,
    /// Lifecycle status, as reported by the task's source.
    pub status: TaskStatus,
}

impl Task {
    /// Creates a new pending task.
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instruction: instruction.into(),
            status: TaskStatus::Pending,
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with a failure.
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A structured function call attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the called function.
    pub name: String,
    /// String-keyed argument map.
    pub arguments: BTreeMap<String, String>,
}

/// One chat message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Speaker role ("user", "assistant", "function", ...).
    pub role: String,
    /// Text content of the message.
    pub content: String,
    /// Structured function call, when the message carries one. For
    /// tool-response messages this echoes the originating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    /// Creates a plain text message.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            function_call: None,
        }
    }

    /// Attaches a function call to the message.
    pub fn with_function_call<I, K, V>(mut self, name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.function_call = Some(FunctionCall {
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }
}

/// The finished, ordered conversation an executor produced for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Identifies this specific task execution.
    pub session_id: String,
    /// Messages in conversation order.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Creates a new conversation.
    pub fn new(session_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            session_id: session_id.into(),
            messages,
        }
    }
}

/// External collaborator that runs a task and returns its conversation.
///
/// The call blocks until the agent session is finished; conversations are
/// expensive, so callers run each task exactly once and fan the result
/// out to every evaluator.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Executes the task and returns the resulting conversation.
    async fn execute(&self, task: &Task) -> Result<Conversation, BoxError>;
}
