//! Composition of several type-unique evaluators over one conversation.

use std::collections::HashMap;

use crate::action::Action;
use crate::error::EvalError;
use crate::result::{fresh_run_id, AgentEvalResult, EvalResult, AGENT_RESULT_TAG};
use crate::task::Message;

use super::{ensure_unique_evaluators, Eval};

/// Runs several evaluators over the same conversation and merges their
/// agent results into one.
///
/// Members must be type-unique; each member filters the shared
/// expected-action list down to its own subtype, so no expected action is
/// double-counted across members.
pub struct CompositeEval {
    members: Vec<Box<dyn Eval>>,
}

impl std::fmt::Debug for CompositeEval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeEval")
            .field(
                "members",
                &self.members.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CompositeEval {
    /// Creates a composite over the given members, rejecting duplicate
    /// member types.
    pub fn new(members: Vec<Box<dyn Eval>>) -> Result<Self, EvalError> {
        ensure_unique_evaluators(&members)?;
        Ok(Self { members })
    }
}

impl Eval for CompositeEval {
    fn name(&self) -> &'static str {
        "composite_eval"
    }

    /// Concatenates member extractions in member order.
    fn extract_action(&self, message: &Message) -> Result<Vec<Action>, EvalError> {
        let mut actions = Vec::new();
        for member in &self.members {
            actions.extend(member.extract_action(message)?);
        }
        Ok(actions)
    }

    /// A composite has no single authoritative subtype; members filter
    /// for themselves inside `process_result`.
    fn filter_actions(&self, _actions: &[Action]) -> Result<Vec<Action>, EvalError> {
        Err(EvalError::UnsupportedFilter(self.name()))
    }

    /// Runs every member's own `process_result` and aggregates.
    fn process_result(
        &self,
        expected_actions: &[Action],
        messages: &[Message],
        session_id: &str,
        run_id: Option<&str>,
    ) -> Result<EvalResult, EvalError> {
        // Members left to mint their own run ids would each produce a
        // distinct one and fail the aggregation consistency check, so
        // resolve the id here and hand the same one to every member.
        let run_id = run_id.map(str::to_string).unwrap_or_else(fresh_run_id);

        let mut results = Vec::with_capacity(self.members.len());
        for member in &self.members {
            results.push(member.process_result(
                expected_actions,
                messages,
                session_id,
                Some(&run_id),
            )?);
        }
        aggregate_agent_results(&results)
    }
}

/// Merges several agent results from the same session into one.
///
/// Match maps merge with later entries winning on (unlikely) key overlap;
/// extras concatenate in member order. All inputs must agree on session
/// and run identifiers and must be agent results.
pub fn aggregate_agent_results(results: &[EvalResult]) -> Result<EvalResult, EvalError> {
    let first = results.first().ok_or(EvalError::EmptyAggregation)?;

    let mut match_results: HashMap<Action, bool> = HashMap::new();
    let mut extra_actions: Vec<Action> = Vec::new();
    for result in results {
        let agent = match result {
            EvalResult::Agent(agent) => agent,
            other => {
                return Err(EvalError::InvalidEvaluatorResult {
                    evaluator: "aggregation".to_string(),
                    expected: AGENT_RESULT_TAG.to_string(),
                    actual: other.type_tag().to_string(),
                });
            }
        };
        if agent.session_id != first.session_id() {
            return Err(EvalError::InconsistentSession {
                field: "session_id".to_string(),
                left: first.session_id().to_string(),
                right: agent.session_id.clone(),
            });
        }
        if agent.run_id != first.run_id() {
            return Err(EvalError::InconsistentSession {
                field: "run_id".to_string(),
                left: first.run_id().to_string(),
                right: agent.run_id.clone(),
            });
        }
        match_results.extend(
            agent
                .match_results
                .iter()
                .map(|(action, matched)| (action.clone(), *matched)),
        );
        extra_actions.extend(agent.extra_actions.iter().cloned());
    }

    Ok(EvalResult::Agent(AgentEvalResult::new(
        match_results,
        extra_actions,
        first.session_id(),
        Some(first.run_id()),
    )))
}
