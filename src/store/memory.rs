//! In-memory result store for tests and short-lived runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::result::EvalResult;

use super::{matches_filters, ResultStore};

/// Keeps every written result in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    results: Mutex<Vec<EvalResult>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EvalResult>> {
        // A poisoned lock only means a panic mid-push; the Vec is still
        // coherent, so recover the guard.
        self.results.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn write_result(&self, result: &EvalResult) -> Result<(), StoreError> {
        self.lock().push(result.clone());
        Ok(())
    }

    async fn get_results(
        &self,
        session_id: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<Vec<EvalResult>, StoreError> {
        if session_id.is_none() && run_id.is_none() {
            return Err(StoreError::MissingFilter);
        }
        Ok(self
            .lock()
            .iter()
            .filter(|r| matches_filters(r, session_id, run_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, FunctionCallAction};
    use crate::result::AgentEvalResult;

    fn result(session_id: &str, run_id: &str) -> EvalResult {
        let action = Action::FunctionCall(FunctionCallAction::new("f", [("x", "1")]));
        EvalResult::Agent(AgentEvalResult::new(
            [(action, true)].into_iter().collect(),
            Vec::new(),
            session_id,
            Some(run_id),
        ))
    }

    #[tokio::test]
    async fn test_write_and_query_by_session() {
        let store = MemoryStore::new();
        store.write_result(&result("s1", "run-1")).await.unwrap();
        store.write_result(&result("s2", "run-1")).await.unwrap();

        let found = store.get_results(Some("s1"), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id(), "s1");
    }

    #[tokio::test]
    async fn test_query_by_run_spans_sessions() {
        let store = MemoryStore::new();
        store.write_result(&result("s1", "run-1")).await.unwrap();
        store.write_result(&result("s2", "run-1")).await.unwrap();
        store.write_result(&result("s3", "run-2")).await.unwrap();

        let found = store.get_results(None, Some("run-1")).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_both_filters_must_match() {
        let store = MemoryStore::new();
        store.write_result(&result("s1", "run-1")).await.unwrap();

        let found = store.get_results(Some("s1"), Some("run-2")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_query_is_rejected() {
        let store = MemoryStore::new();
        let err = store.get_results(None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingFilter));
    }
}
