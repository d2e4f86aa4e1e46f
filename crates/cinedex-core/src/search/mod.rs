//! Search engine contract and implementations.
//!
//! Every backend implements [`SearchEngine`]: point lookups, query execution
//! and collection counts against named collections. Engines only execute
//! [`QuerySpec`]s that were built for them; anything else is rejected with
//! [`SearchErrorKind::EngineMismatch`].
//!
//! | Engine | Kind | Description |
//! |--------|------|-------------|
//! | [`ElasticSearchEngine`] | [`EngineKind::Elastic`] | Elasticsearch REST API over [`crate::http_client::HttpClient`] |
//! | [`InMemorySearchEngine`] | [`EngineKind::Memory`] | Process-local documents, fixture files |
//! | [`GuardedSearchEngine`] | inner engine's kind | Circuit breaker per operation |
//!
//! Absent collections and absent documents are normal outcomes: `get`
//! yields `None`, `search` an empty list and `count` zero.

pub mod elastic;
mod guarded;
pub mod memory;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::query::QuerySpec;

pub use elastic::ElasticSearchEngine;
pub use guarded::GuardedSearchEngine;
pub use memory::InMemorySearchEngine;

/// Raw document as stored by the backend.
pub type Document = serde_json::Value;

/// Boxed future returned by [`SearchEngine`] methods.
pub type SearchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchError>> + Send + 'a>>;

/// Concrete engine implementation that query builders link against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Elastic,
    Memory,
}

impl EngineKind {
    pub const ALL: [Self; 2] = [Self::Elastic, Self::Memory];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elastic => "elastic",
            Self::Memory => "memory",
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorKind {
    /// Rejected by an open circuit breaker; no backend call was made.
    Unavailable,
    /// The backend could not be reached or answered with an error status.
    Transport,
    /// The query spec was built for a different engine.
    EngineMismatch,
    /// The backend answered with a payload this engine cannot read.
    Malformed,
    Internal,
}

/// Structured engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchError {
    kind: SearchErrorKind,
    message: String,
}

impl SearchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SearchErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SearchErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn engine_mismatch(expected: EngineKind, actual: EngineKind) -> Self {
        Self {
            kind: SearchErrorKind::EngineMismatch,
            message: format!("engine '{expected}' cannot execute a query built for '{actual}'"),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SearchErrorKind::Malformed,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SearchErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SearchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SearchErrorKind::Unavailable => "search.unavailable",
            SearchErrorKind::Transport => "search.transport",
            SearchErrorKind::EngineMismatch => "search.engine_mismatch",
            SearchErrorKind::Malformed => "search.malformed",
            SearchErrorKind::Internal => "search.internal",
        }
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SearchError {}

/// Search backend contract.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`kind`](SearchEngine::kind) | Engine implementation this instance belongs to |
/// | [`get`](SearchEngine::get) | Document by id, `None` when absent |
/// | [`search`](SearchEngine::search) | Execute a [`QuerySpec`] built for this engine |
/// | [`count`](SearchEngine::count) | Number of documents in a collection |
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// entity service for the lifetime of the process.
pub trait SearchEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> SearchFuture<'a, Option<Document>>;

    /// Runs a query; result order follows the query's sort and window.
    ///
    /// # Errors
    ///
    /// Returns [`SearchErrorKind::EngineMismatch`] when `query` was built for
    /// another engine.
    fn search<'a>(
        &'a self,
        collection: &'a str,
        query: &'a QuerySpec,
    ) -> SearchFuture<'a, Vec<Document>>;

    fn count<'a>(&'a self, collection: &'a str) -> SearchFuture<'a, u64>;
}

/// Reject a spec whose linked engine is not `engine`.
pub fn ensure_engine(engine: EngineKind, query: &QuerySpec) -> Result<(), SearchError> {
    if query.engine() == engine {
        Ok(())
    } else {
        Err(SearchError::engine_mismatch(engine, query.engine()))
    }
}
