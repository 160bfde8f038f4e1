//! End-to-end run: scripted executor, composite evaluator set, in-memory
//! persistence, batch metrics.

use std::sync::Arc;

use async_trait::async_trait;
use evalforge::action::{Action, CodeWritingAction, FunctionCallAction};
use evalforge::error::BoxError;
use evalforge::eval::{CodeWritingEval, Eval, FunctionCallEval};
use evalforge::harness::EvalHarness;
use evalforge::script::ScriptValue;
use evalforge::store::{MemoryStore, ResultStore};
use evalforge::task::{Conversation, Message, Task, TaskExecutor};
use ordered_float::OrderedFloat;

/// Produces the same conversation for every task: one matching function
/// call, one unexpected one, and a code block binding `result = 1`.
struct ScriptedExecutor;

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, task: &Task) -> Result<Conversation, BoxError> {
        Ok(Conversation::new(
            format!("session-{}", task.id),
            vec![
                Message::new("user", task.instruction.clone()),
                Message::new("assistant", "").with_function_call("f0", [("x", "1")]),
                Message::new("assistant", "").with_function_call("fx", [("x", "9")]),
                Message::new(
                    "assistant",
                    "Here is the value:\n```python\nresult = 1\n```",
                ),
            ],
        ))
    }
}

fn fc(name: &str, value: &str) -> Action {
    Action::FunctionCall(FunctionCallAction::new(name, [("x", value)]))
}

fn cw(value: f64) -> Action {
    Action::CodeWriting(CodeWritingAction::from_value(ScriptValue::Number(
        OrderedFloat(value),
    )))
}

/// Per task: four expected actions of which two are observed.
fn expected_actions() -> Vec<Action> {
    vec![fc("f0", "1"), fc("f1", "1"), cw(1.0), cw(2.0)]
}

fn evaluators() -> Vec<Box<dyn Eval>> {
    vec![
        Box::new(FunctionCallEval::new()),
        Box::new(CodeWritingEval::new(["result"])),
    ]
}

#[tokio::test]
async fn test_aggregated_batch_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let harness = EvalHarness::new(evaluators(), store.clone()).unwrap();
    let tasks = vec![
        (Task::new("t1", "first task"), expected_actions()),
        (Task::new("t2", "second task"), expected_actions()),
    ];

    let metrics = harness
        .evaluate(&tasks, &ScriptedExecutor, true)
        .await
        .unwrap();

    // One merged result per task.
    assert_eq!(metrics.results().len(), 2);

    // 2 tasks x 4 expected actions, half of which were observed.
    assert_eq!(metrics.total_actions(), 8);
    assert_eq!(metrics.total_successful_actions(), 4);
    assert_eq!(metrics.action_success_rate(), 0.5);

    // The unexpected call shows up once per task.
    assert_eq!(metrics.total_extra_actions(), 2);

    // Every result misses f1 and the second bound value.
    assert_eq!(metrics.full_match_rate(), 0.0);
    assert_eq!(metrics.partial_match_rate(), 1.0);

    let successful = metrics.successful_actions_frequency();
    assert_eq!(successful.get(&fc("f0", "1").to_string()), Some(&2));
    assert_eq!(successful.get(&cw(1.0).to_string()), Some(&2));
    assert_eq!(successful.len(), 2);

    let failed = metrics.failed_actions_frequency();
    assert_eq!(failed.get(&fc("f1", "1").to_string()), Some(&2));
    assert_eq!(failed.get(&cw(2.0).to_string()), Some(&2));
    assert_eq!(failed.len(), 2);

    assert_eq!(
        metrics.extra_action_frequency().get(&fc("fx", "9").to_string()),
        Some(&2)
    );
}

#[tokio::test]
async fn test_results_are_persisted_under_the_run_id() {
    let store = Arc::new(MemoryStore::new());
    let harness = EvalHarness::new(evaluators(), store.clone()).unwrap();
    let tasks = vec![(Task::new("t1", "first task"), expected_actions())];

    harness
        .evaluate(&tasks, &ScriptedExecutor, true)
        .await
        .unwrap();

    let stored = store
        .get_results(None, Some(harness.run_id()))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].session_id(), "session-t1");
    assert!(!stored[0].is_full_match());
    assert!(stored[0].is_partial_match());
}

#[tokio::test]
async fn test_unaggregated_run_keeps_per_evaluator_results() {
    let store = Arc::new(MemoryStore::new());
    let harness = EvalHarness::new(evaluators(), store.clone()).unwrap();
    let tasks = vec![(Task::new("t1", "first task"), expected_actions())];

    let metrics = harness
        .evaluate(&tasks, &ScriptedExecutor, false)
        .await
        .unwrap();

    // One result per evaluator per task; totals are unchanged because
    // each evaluator only claims its own action subtype.
    assert_eq!(metrics.results().len(), 2);
    assert_eq!(metrics.total_actions(), 4);
    assert_eq!(metrics.total_successful_actions(), 2);

    let stored = store
        .get_results(Some("session-t1"), None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}
