//! Persistence for evaluation results.
//!
//! The harness writes through a [`ResultStore`] so callers choose where
//! results land: in memory for tests and short-lived runs, or on disk as
//! one JSON file per result.

pub mod file;
pub mod memory;

use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::result::EvalResult;

/// A sink and query surface for evaluation results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists one result.
    async fn write_result(&self, result: &EvalResult) -> Result<(), StoreError>;

    /// Returns results matching the given filters, in insertion order.
    ///
    /// At least one filter must be given; an unfiltered scan over every
    /// run ever recorded is rejected with [`StoreError::MissingFilter`].
    /// When both filters are given, results must match both.
    async fn get_results(
        &self,
        session_id: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<Vec<EvalResult>, StoreError>;
}

pub(crate) fn matches_filters(
    result: &EvalResult,
    session_id: Option<&str>,
    run_id: Option<&str>,
) -> bool {
    session_id.map_or(true, |s| result.session_id() == s)
        && run_id.map_or(true, |r| result.run_id() == r)
}
