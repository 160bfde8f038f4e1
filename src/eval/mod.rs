//! Evaluators: strategies that extract actions from conversation content
//! and compare them against expected action sets.
//!
//! Each concrete evaluator implements only `extract_action` (pull zero or
//! more actions out of one message) and `filter_actions` (narrow an
//! expected-action list to the subtype it is authoritative over); the
//! matching algorithm in `process_result` is shared. The composite
//! evaluator composes several type-unique members and aggregates their
//! results into one.

pub mod code_writing;
pub mod composite;
pub mod function_call;
pub mod search;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

pub use code_writing::CodeWritingEval;
pub use composite::{aggregate_agent_results, CompositeEval};
pub use function_call::FunctionCallEval;
pub use search::SearchEval;

use crate::action::Action;
use crate::error::EvalError;
use crate::result::{AgentEvalResult, EvalResult};
use crate::task::{Message, Task, TaskExecutor};

/// An action-extraction strategy over conversation messages.
#[async_trait]
pub trait Eval: Send + Sync {
    /// Stable name identifying the concrete evaluator type. Used for the
    /// type-uniqueness checks in composite and harness construction.
    fn name(&self) -> &'static str;

    /// Extracts zero or more actions from one message.
    ///
    /// "No action present" is the normal empty case, never an error;
    /// structurally malformed input the evaluator was asked to interpret
    /// (an unclosed code fence, unparsable tool-response content) is.
    fn extract_action(&self, message: &Message) -> Result<Vec<Action>, EvalError>;

    /// Narrows a candidate action list to the subtype this evaluator is
    /// authoritative over, so a composite can split one expected-action
    /// list across members without double-counting.
    fn filter_actions(&self, actions: &[Action]) -> Result<Vec<Action>, EvalError>;

    /// Diffs expected actions against everything this evaluator observes
    /// in the conversation.
    ///
    /// Observed actions accumulate in message order, duplicates and
    /// ordering preserved. Each filtered expected action matches iff a
    /// value-equal action was observed anywhere; every observed action
    /// without a value-equal expected counterpart lands in
    /// `extra_actions` in first-seen order.
    fn process_result(
        &self,
        expected_actions: &[Action],
        messages: &[Message],
        session_id: &str,
        run_id: Option<&str>,
    ) -> Result<EvalResult, EvalError> {
        let expected = self.filter_actions(expected_actions)?;

        let mut observed = Vec::new();
        for message in messages {
            observed.extend(self.extract_action(message)?);
        }
        debug!(
            evaluator = self.name(),
            session_id,
            expected = expected.len(),
            observed = observed.len(),
            "processing evaluation result"
        );

        let match_results = expected
            .iter()
            .map(|action| (action.clone(), observed.contains(action)))
            .collect();
        let extra_actions = observed
            .into_iter()
            .filter(|action| !expected.contains(action))
            .collect();

        Ok(EvalResult::Agent(AgentEvalResult::new(
            match_results,
            extra_actions,
            session_id,
            run_id,
        )))
    }

    /// Runs the task through the executor, then processes the resulting
    /// conversation.
    async fn generate_eval_result(
        &self,
        task: &Task,
        expected_actions: &[Action],
        executor: &dyn TaskExecutor,
    ) -> Result<EvalResult, EvalError> {
        let conversation = executor
            .execute(task)
            .await
            .map_err(EvalError::Execution)?;
        self.process_result(
            expected_actions,
            &conversation.messages,
            &conversation.session_id,
            None,
        )
    }
}

/// Rejects evaluator sets containing two evaluators of the same concrete
/// type. Shared by composite and harness construction.
pub fn ensure_unique_evaluators(evaluators: &[Box<dyn Eval>]) -> Result<(), EvalError> {
    let mut seen = HashSet::new();
    for evaluator in evaluators {
        if !seen.insert(evaluator.name()) {
            return Err(EvalError::DuplicateEvaluatorType(
                evaluator.name().to_string(),
            ));
        }
    }
    Ok(())
}
