//! Search actions: a query plus its ranked result list.

use std::fmt;

use super::payload::{self, Payload, PayloadValue, TYPE_KEY};
use super::registry::ActionRegistry;
use super::Action;
use crate::error::ActionError;

/// Payload discriminator for search actions.
pub const TYPE_TAG: &str = "search";

/// A search invocation made by the agent.
///
/// `search_results` is ranked: order is significant, and position-aware
/// comparison (top-1, top-K) happens in the symbol-search result variant
/// rather than through plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchAction {
    /// The query string that was searched.
    pub query: String,
    /// Ranked result strings, best match first.
    pub search_results: Vec<String>,
}

impl SearchAction {
    /// Creates a new search action.
    pub fn new<I, S>(query: impl Into<String>, search_results: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            search_results: search_results.into_iter().map(Into::into).collect(),
        }
    }

    /// Serializes to payload form.
    pub fn to_payload(&self) -> Payload {
        let mut p = Payload::new();
        p.insert(TYPE_KEY.to_string(), TYPE_TAG.into());
        p.insert("query".to_string(), self.query.clone().into());
        p.insert(
            "search_results".to_string(),
            PayloadValue::List(self.search_results.clone()),
        );
        p
    }

    /// Deserializes from payload form.
    pub fn from_payload(p: &Payload, _registry: &ActionRegistry) -> Result<Action, ActionError> {
        let query = payload::get_str(p, "query")?.to_string();
        let search_results = payload::get_list(p, "search_results")?.to_vec();
        Ok(Action::Search(Self {
            query,
            search_results,
        }))
    }
}

impl fmt::Display for SearchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "search(query={}, results=[{}])",
            self.query,
            self.search_results.join(", ")
        )
    }
}
