//! Typed failures for the indexing and query orchestrators.
//!
//! Store implementations report errors as [`anyhow::Error`]; the
//! orchestrators classify them here so callers can branch on the kind of
//! failure instead of parsing a status string.

/// Why an indexing run failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store rejected a write (chunk insert, status update).
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Why a query failed. An empty corpus is not a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("failed to load corpus: {0}")]
    Store(String),

    /// The task running the query panicked or was cancelled.
    #[error("query task failed: {0}")]
    Task(String),
}

impl IndexError {
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        IndexError::Persistence(format!("{:#}", err))
    }

    pub(crate) fn unexpected(err: anyhow::Error) -> Self {
        IndexError::Unexpected(format!("{:#}", err))
    }
}

impl SearchError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        SearchError::Store(format!("{:#}", err))
    }
}
