//! Evaluator for search invocations and their ranked results.

use crate::action::{Action, SearchAction};
use crate::error::EvalError;
use crate::result::{EvalResult, SymbolSearchEvalResult};
use crate::task::Message;

use super::Eval;

/// Default function name a search call travels under.
const DEFAULT_FUNCTION_NAME: &str = "search";

/// Extracts [`SearchAction`]s from tool-response messages.
///
/// A search surfaces in the conversation as a tool-response message
/// (role "function") whose echoed call matches the configured function
/// name and whose content is the JSON array of ranked result strings.
#[derive(Debug, Clone)]
pub struct SearchEval {
    function_name: String,
}

impl SearchEval {
    /// Creates a search evaluator for the default function name.
    pub fn new() -> Self {
        Self {
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
        }
    }

    /// Overrides the function name search calls travel under.
    pub fn with_function_name(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = function_name.into();
        self
    }

    /// Builds the position-aware 1:1 result for a tool-call pair.
    pub fn process_tool_result(
        &self,
        expected_action: Option<SearchAction>,
        observed_action: Option<SearchAction>,
        session_id: &str,
        run_id: Option<&str>,
    ) -> EvalResult {
        EvalResult::SymbolSearch(SymbolSearchEvalResult::new(
            expected_action,
            observed_action,
            session_id,
            run_id,
        ))
    }
}

impl Default for SearchEval {
    fn default() -> Self {
        Self::new()
    }
}

impl Eval for SearchEval {
    fn name(&self) -> &'static str {
        "search_eval"
    }

    fn extract_action(&self, message: &Message) -> Result<Vec<Action>, EvalError> {
        if message.role != "function" {
            return Ok(Vec::new());
        }
        let call = match &message.function_call {
            Some(call) if call.name == self.function_name => call,
            _ => return Ok(Vec::new()),
        };

        let query = call.arguments.get("query").ok_or_else(|| {
            EvalError::MalformedMessage(format!(
                "search call '{}' carries no 'query' argument",
                self.function_name
            ))
        })?;

        let search_results: Vec<String> = if message.content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&message.content).map_err(|e| {
                EvalError::MalformedMessage(format!(
                    "search response content is not a JSON list of strings: {e}"
                ))
            })?
        };

        Ok(vec![Action::Search(SearchAction::new(
            query.clone(),
            search_results,
        ))])
    }

    fn filter_actions(&self, actions: &[Action]) -> Result<Vec<Action>, EvalError> {
        Ok(actions
            .iter()
            .filter(|action| matches!(action, Action::Search(_)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_response(name: &str, query: &str, content: &str) -> Message {
        Message::new("function", content).with_function_call(name, [("query", query)])
    }

    #[test]
    fn test_extracts_search_with_results() {
        let eval = SearchEval::new();
        let message = search_response("search", "needle", r#"["r1", "r2"]"#);

        let actions = eval.extract_action(&message).unwrap();
        assert_eq!(
            actions,
            vec![Action::Search(SearchAction::new("needle", ["r1", "r2"]))]
        );
    }

    #[test]
    fn test_other_functions_are_skipped() {
        let eval = SearchEval::new();
        let message = search_response("read_file", "needle", r#"["r1"]"#);
        assert!(eval.extract_action(&message).unwrap().is_empty());
    }

    #[test]
    fn test_assistant_message_is_skipped() {
        let eval = SearchEval::new();
        let message =
            Message::new("assistant", r#"["r1"]"#).with_function_call("search", [("query", "q")]);
        assert!(eval.extract_action(&message).unwrap().is_empty());
    }

    #[test]
    fn test_empty_content_means_no_results() {
        let eval = SearchEval::new();
        let message = search_response("search", "needle", "");
        let actions = eval.extract_action(&message).unwrap();
        assert_eq!(
            actions,
            vec![Action::Search(SearchAction::new("needle", Vec::<String>::new()))]
        );
    }

    #[test]
    fn test_missing_query_is_malformed() {
        let eval = SearchEval::new();
        let message = Message::new("function", r#"["r1"]"#)
            .with_function_call("search", [("pattern", "q")]);
        let err = eval.extract_action(&message).unwrap_err();
        assert!(matches!(err, EvalError::MalformedMessage(_)));
    }

    #[test]
    fn test_unparsable_content_is_malformed() {
        let eval = SearchEval::new();
        let message = search_response("search", "q", "not json");
        let err = eval.extract_action(&message).unwrap_err();
        assert!(matches!(err, EvalError::MalformedMessage(_)));
    }

    #[test]
    fn test_custom_function_name() {
        let eval = SearchEval::new().with_function_name("symbol_search");
        let message = search_response("symbol_search", "q", r#"["r1"]"#);
        assert_eq!(eval.extract_action(&message).unwrap().len(), 1);
    }

    #[test]
    fn test_process_tool_result_builds_symbol_search_variant() {
        let eval = SearchEval::new();
        let result = eval.process_tool_result(
            Some(SearchAction::new("q", ["r1"])),
            Some(SearchAction::new("q", ["r1"])),
            "session-1",
            Some("run-1"),
        );
        assert!(matches!(result, EvalResult::SymbolSearch(_)));
        assert!(result.is_full_match());
    }
}
