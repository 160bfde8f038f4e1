//! Evaluator for values bound inside agent-written code blocks.

use crate::action::{Action, CodeWritingAction};
use crate::error::{EvalError, ScriptError};
use crate::script::{extract_code_block, run_script};
use crate::task::Message;

use super::Eval;

/// Default fence language tag for extracted code blocks.
const DEFAULT_LANGUAGE: &str = "python";

/// Extracts [`CodeWritingAction`]s by interpreting the first fenced code
/// block of a message and reading the configured target variables.
///
/// Failure handling follows the two failure classes of agent output:
/// - an interpretation failure (bad value) becomes an error-carrying
///   action, surfacing as a mismatch rather than an exception;
/// - a structural failure (unclosed fence, or a script that binds none of
///   the target variables) propagates, since the agent's output shape is
///   broken rather than its value.
#[derive(Debug, Clone)]
pub struct CodeWritingEval {
    language: String,
    target_variables: Vec<String>,
}

impl CodeWritingEval {
    /// Creates a new code-writing evaluator for the given target
    /// variable names.
    pub fn new<I, S>(target_variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            target_variables: target_variables.into_iter().map(Into::into).collect(),
        }
    }

    /// Overrides the fence language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Eval for CodeWritingEval {
    fn name(&self) -> &'static str {
        "code_writing_eval"
    }

    fn extract_action(&self, message: &Message) -> Result<Vec<Action>, EvalError> {
        let block = match extract_code_block(&message.content, &self.language)? {
            Some(block) => block,
            None => return Ok(Vec::new()),
        };

        let bindings = match run_script(&block) {
            Ok(bindings) => bindings,
            Err(err @ ScriptError::Eval(_)) => {
                return Ok(vec![Action::CodeWriting(CodeWritingAction::from_error(
                    err.to_string(),
                ))]);
            }
            Err(other) => return Err(other.into()),
        };

        let actions: Vec<Action> = self
            .target_variables
            .iter()
            .filter_map(|name| bindings.get(name))
            .map(|value| Action::CodeWriting(CodeWritingAction::from_value(value.clone())))
            .collect();

        if actions.is_empty() {
            return Err(
                ScriptError::TargetVariableNotFound(self.target_variables.clone()).into(),
            );
        }
        Ok(actions)
    }

    fn filter_actions(&self, actions: &[Action]) -> Result<Vec<Action>, EvalError> {
        Ok(actions
            .iter()
            .filter(|action| matches!(action, Action::CodeWriting(_)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptValue;
    use ordered_float::OrderedFloat;

    fn message(content: &str) -> Message {
        Message::new("assistant", content)
    }

    #[test]
    fn test_no_code_block_yields_nothing() {
        let eval = CodeWritingEval::new(["result"]);
        let actions = eval.extract_action(&message("just prose")).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_extracts_target_binding() {
        let eval = CodeWritingEval::new(["result"]);
        let actions = eval
            .extract_action(&message("```python\nresult = 42\n```"))
            .unwrap();

        assert_eq!(
            actions,
            vec![Action::CodeWriting(CodeWritingAction::from_value(
                ScriptValue::Number(OrderedFloat(42.0))
            ))]
        );
    }

    #[test]
    fn test_emits_one_action_per_target_variable() {
        let eval = CodeWritingEval::new(["first", "second"]);
        let actions = eval
            .extract_action(&message("```python\nfirst = 1\nsecond = 2\nignored = 3\n```"))
            .unwrap();
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_script_failure_becomes_error_action() {
        let eval = CodeWritingEval::new(["result"]);
        let actions = eval
            .extract_action(&message("```python\nresult = compute(1)\n```"))
            .unwrap();

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::CodeWriting(action) => {
                assert!(action.value.is_none());
                assert!(action.error.is_some());
            }
            other => panic!("expected a code-writing action, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_target_variable_propagates() {
        let eval = CodeWritingEval::new(["result"]);
        let err = eval
            .extract_action(&message("```python\nother = 1\n```"))
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::Script(ScriptError::TargetVariableNotFound(_))
        ));
    }

    #[test]
    fn test_unclosed_fence_propagates() {
        let eval = CodeWritingEval::new(["result"]);
        let err = eval
            .extract_action(&message("```python\nresult = 1\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::Script(ScriptError::UnclosedCodeBlock)
        ));
    }

    #[test]
    fn test_language_tag_respected() {
        let eval = CodeWritingEval::new(["result"]).with_language("json5");
        let actions = eval
            .extract_action(&message("```python\nresult = 1\n```"))
            .unwrap();
        assert!(actions.is_empty());
    }
}
