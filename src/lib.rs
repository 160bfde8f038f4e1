//! evalforge: evaluation core for agent tasks.
//!
//! This library runs autonomous agent tasks through an external executor,
//! extracts structured actions (function calls, code-written values, search
//! invocations) from the resulting conversations, compares them against
//! expected action sets, and aggregates the outcomes into match statistics.

// Core modules
pub mod action;
pub mod error;
pub mod eval;
pub mod harness;
pub mod loader;
pub mod metrics;
pub mod result;
pub mod script;
pub mod store;
pub mod task;

// Re-export commonly used error types
pub use error::{ActionError, EvalError, HarnessError, LoaderError, ScriptError, StoreError};
