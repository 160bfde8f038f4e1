//! Batch orchestration: run tasks, evaluate conversations, persist
//! results, report metrics.

use std::sync::Arc;

use tracing::{error, info};

use crate::action::Action;
use crate::error::{BoxError, EvalError, HarnessError};
use crate::eval::{aggregate_agent_results, ensure_unique_evaluators, Eval};
use crate::metrics::Metrics;
use crate::result::{fresh_run_id, EvalResult};
use crate::store::ResultStore;
use crate::task::{Task, TaskExecutor};

/// Runs a batch of tasks through an executor and a fixed evaluator set.
///
/// Tasks run strictly one at a time; each task execution carries side
/// effects (a live agent session, a persisted conversation) this layer
/// does not attempt to isolate across tasks. No timeout is applied to
/// the executor call, so a hung execution blocks the whole batch.
pub struct EvalHarness {
    evaluators: Vec<Box<dyn Eval>>,
    store: Arc<dyn ResultStore>,
    run_id: String,
}

impl std::fmt::Debug for EvalHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalHarness")
            .field(
                "evaluators",
                &self.evaluators.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl EvalHarness {
    /// Creates a harness over a type-unique evaluator set, minting a
    /// fresh run id for the batch.
    pub fn new(
        evaluators: Vec<Box<dyn Eval>>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, EvalError> {
        ensure_unique_evaluators(&evaluators)?;
        Ok(Self {
            evaluators,
            store,
            run_id: fresh_run_id(),
        })
    }

    /// The run identifier stamped on every result of this batch.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Evaluates every `(task, expected actions)` pair in order.
    ///
    /// With `aggregate` set, the per-evaluator results of each task merge
    /// into one agent result before persistence; otherwise each
    /// evaluator's result is persisted and counted individually.
    ///
    /// The first failure (executor, evaluator, or store write) aborts the
    /// batch; results persisted before the failure remain stored, but no
    /// metrics are produced.
    pub async fn evaluate(
        &self,
        tasks: &[(Task, Vec<Action>)],
        executor: &dyn TaskExecutor,
        aggregate: bool,
    ) -> Result<Metrics, HarnessError> {
        info!(
            run_id = %self.run_id,
            tasks = tasks.len(),
            evaluators = self.evaluators.len(),
            aggregate,
            "starting evaluation batch"
        );

        let mut collected = Vec::new();
        for (task, expected_actions) in tasks {
            let results = self
                .evaluate_task(task, expected_actions, executor, aggregate)
                .await
                .map_err(|source| {
                    error!(run_id = %self.run_id, task_id = %task.id, %source, "evaluation failed");
                    HarnessError::ExecutionFailed {
                        task_id: task.id.clone(),
                        source,
                    }
                })?;
            collected.extend(results);
        }

        info!(run_id = %self.run_id, results = collected.len(), "evaluation batch complete");
        Ok(Metrics::new(collected))
    }

    async fn evaluate_task(
        &self,
        task: &Task,
        expected_actions: &[Action],
        executor: &dyn TaskExecutor,
        aggregate: bool,
    ) -> Result<Vec<EvalResult>, BoxError> {
        let conversation = executor.execute(task).await?;

        let mut results = Vec::with_capacity(self.evaluators.len());
        for evaluator in &self.evaluators {
            results.push(evaluator.process_result(
                expected_actions,
                &conversation.messages,
                &conversation.session_id,
                Some(&self.run_id),
            )?);
        }
        if aggregate {
            results = vec![aggregate_agent_results(&results)?];
        }

        for result in &results {
            self.store.write_result(result).await?;
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FunctionCallAction;
    use crate::eval::{CodeWritingEval, FunctionCallEval};
    use crate::store::MemoryStore;
    use crate::task::{Conversation, Message};
    use async_trait::async_trait;

    struct ScriptedExecutor;

    #[async_trait]
    impl TaskExecutor for ScriptedExecutor {
        async fn execute(&self, task: &Task) -> Result<Conversation, BoxError> {
            Ok(Conversation {
                session_id: format!("session-{}", task.id),
                messages: vec![Message::new("assistant", "").with_function_call("f", [("x", "1")])],
            })
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl TaskExecutor for FailingExecutor {
        async fn execute(&self, _task: &Task) -> Result<Conversation, BoxError> {
            Err("agent session crashed".into())
        }
    }

    fn fc(name: &str) -> Action {
        Action::FunctionCall(FunctionCallAction::new(name, [("x", "1")]))
    }

    fn harness(store: Arc<MemoryStore>) -> EvalHarness {
        EvalHarness::new(vec![Box::new(FunctionCallEval::new())], store).unwrap()
    }

    #[test]
    fn test_rejects_duplicate_evaluators() {
        let evaluators: Vec<Box<dyn Eval>> = vec![
            Box::new(FunctionCallEval::new()),
            Box::new(FunctionCallEval::new()),
        ];
        let err = EvalHarness::new(evaluators, Arc::new(MemoryStore::new())).unwrap_err();
        assert!(matches!(err, EvalError::DuplicateEvaluatorType(_)));
    }

    #[tokio::test]
    async fn test_evaluate_persists_and_reports() {
        let store = Arc::new(MemoryStore::new());
        let harness = harness(store.clone());
        let tasks = vec![(Task::new("t1", "do the thing"), vec![fc("f"), fc("g")])];

        let metrics = harness
            .evaluate(&tasks, &ScriptedExecutor, false)
            .await
            .unwrap();

        assert_eq!(metrics.total_actions(), 2);
        assert_eq!(metrics.total_successful_actions(), 1);

        let stored = store
            .get_results(None, Some(harness.run_id()))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].session_id(), "session-t1");
    }

    #[tokio::test]
    async fn test_aggregate_merges_per_task_results() {
        let store = Arc::new(MemoryStore::new());
        let evaluators: Vec<Box<dyn Eval>> = vec![
            Box::new(FunctionCallEval::new()),
            Box::new(CodeWritingEval::new(["result"])),
        ];
        let harness = EvalHarness::new(evaluators, store.clone()).unwrap();
        let tasks = vec![(Task::new("t1", "do the thing"), vec![fc("f")])];

        let metrics = harness
            .evaluate(&tasks, &ScriptedExecutor, true)
            .await
            .unwrap();

        // Two evaluators, one merged result per task.
        assert_eq!(metrics.results().len(), 1);
        let stored = store
            .get_results(None, Some(harness.run_id()))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_executor_failure_aborts_with_task_id() {
        let store = Arc::new(MemoryStore::new());
        let harness = harness(store);
        let tasks = vec![(Task::new("t1", "doomed"), vec![fc("f")])];

        let err = harness
            .evaluate(&tasks, &FailingExecutor, false)
            .await
            .unwrap_err();
        let HarnessError::ExecutionFailed { task_id, .. } = err;
        assert_eq!(task_id, "t1");
    }
}
