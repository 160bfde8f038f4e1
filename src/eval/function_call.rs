//! Evaluator for structured function calls made by the agent.

use crate::action::{Action, FunctionCallAction};
use crate::error::EvalError;
use crate::task::Message;

use super::Eval;

/// Extracts [`FunctionCallAction`]s from assistant messages carrying a
/// structured function call.
#[derive(Debug, Clone, Default)]
pub struct FunctionCallEval;

impl FunctionCallEval {
    /// Creates a new function-call evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl Eval for FunctionCallEval {
    fn name(&self) -> &'static str {
        "function_call_eval"
    }

    fn extract_action(&self, message: &Message) -> Result<Vec<Action>, EvalError> {
        // Tool-response messages (role "function") echo the originating
        // call; only the assistant's own call counts as an action.
        if message.role != "assistant" {
            return Ok(Vec::new());
        }
        Ok(message
            .function_call
            .iter()
            .map(|call| {
                Action::FunctionCall(FunctionCallAction::new(
                    call.name.clone(),
                    call.arguments.clone(),
                ))
            })
            .collect())
    }

    fn filter_actions(&self, actions: &[Action]) -> Result<Vec<Action>, EvalError> {
        Ok(actions
            .iter()
            .filter(|action| matches!(action, Action::FunctionCall(_)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SearchAction;

    #[test]
    fn test_extracts_assistant_call() {
        let eval = FunctionCallEval::new();
        let message = Message::new("assistant", "").with_function_call("f", [("x", "1")]);

        let actions = eval.extract_action(&message).unwrap();
        assert_eq!(
            actions,
            vec![Action::FunctionCall(FunctionCallAction::new(
                "f",
                [("x", "1")]
            ))]
        );
    }

    #[test]
    fn test_plain_message_yields_nothing() {
        let eval = FunctionCallEval::new();
        let message = Message::new("assistant", "no call here");
        assert!(eval.extract_action(&message).unwrap().is_empty());
    }

    #[test]
    fn test_tool_response_echo_is_skipped() {
        let eval = FunctionCallEval::new();
        let message = Message::new("function", "ok").with_function_call("f", [("x", "1")]);
        assert!(eval.extract_action(&message).unwrap().is_empty());
    }

    #[test]
    fn test_filter_keeps_only_function_calls() {
        let eval = FunctionCallEval::new();
        let actions = vec![
            Action::FunctionCall(FunctionCallAction::new("f", [("x", "1")])),
            Action::Search(SearchAction::new("q", ["r"])),
        ];

        let filtered = eval.filter_actions(&actions).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(matches!(filtered[0], Action::FunctionCall(_)));
    }
}
