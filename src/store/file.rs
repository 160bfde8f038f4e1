//! File-backed result store: one pretty-printed JSON file per result.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::action::payload::{payload_from_json, payload_to_json};
use crate::action::ActionRegistry;
use crate::error::StoreError;
use crate::result::EvalResult;

use super::{matches_filters, ResultStore};

/// Persists results under a base directory, one file per result named
/// `<session_id>__<uuid>.json`.
pub struct FileStore {
    base_path: PathBuf,
    registry: ActionRegistry,
}

impl FileStore {
    /// Creates a store rooted at `base_path`. The directory is created
    /// lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>, registry: ActionRegistry) -> Self {
        Self {
            base_path: base_path.into(),
            registry,
        }
    }

    /// The directory results are written to.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn ensure_directory(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for FileStore {
    async fn write_result(&self, result: &EvalResult) -> Result<(), StoreError> {
        self.ensure_directory().await?;

        let filename = format!(
            "{}__{}.json",
            sanitize_component(result.session_id()),
            Uuid::new_v4()
        );
        let path = self.base_path.join(&filename);
        let json = payload_to_json(&result.to_payload());
        fs::write(&path, serde_json::to_string_pretty(&json)?).await?;

        debug!(path = %path.display(), "wrote evaluation result");
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
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            let json: serde_json::Value = serde_json::from_str(&content)?;
            let result = EvalResult::from_payload(&payload_from_json(&json)?, &self.registry)?;
            if matches_filters(&result, session_id, run_id) {
                results.push(result);
            }
        }

        // Directory order is arbitrary; return results in write order.
        results.sort_by_key(EvalResult::created_at);
        Ok(results)
    }
}

/// Maps a session id to a safe single filename component. The session id
/// is caller-controlled and may contain path separators; queries read the
/// id back from the file content, so the mapping need not be reversible.
fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, FunctionCallAction};
    use crate::result::AgentEvalResult;
    use tempfile::TempDir;

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
    async fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), ActionRegistry::default());
        let written = result("s1", "run-1");

        store.write_result(&written).await.unwrap();
        let found = store.get_results(Some("s1"), None).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id(), "s1");
        assert_eq!(found[0].run_id(), "run-1");
        assert_eq!(found[0].match_results(), written.match_results());
    }

    #[tokio::test]
    async fn test_filters_by_run_id() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), ActionRegistry::default());
        store.write_result(&result("s1", "run-1")).await.unwrap();
        store.write_result(&result("s2", "run-1")).await.unwrap();
        store.write_result(&result("s3", "run-2")).await.unwrap();

        let found = store.get_results(None, Some("run-1")).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_path_like_session_id_stays_under_base_dir() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), ActionRegistry::default());
        store
            .write_result(&result("../escape/s1", "run-1"))
            .await
            .unwrap();

        // Exactly one file, directly under the base directory.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].file_type().unwrap().is_file());

        // The stored id is untouched; only the filename is mapped.
        let found = store.get_results(Some("../escape/s1"), None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("never-written"), ActionRegistry::default());
        let found = store.get_results(Some("s1"), None).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), ActionRegistry::default());
        let err = store.get_results(None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingFilter));
    }
}
