//! Error types for search operations
//!
//! This module defines the error taxonomy for indexing and query resolution.
//! Nothing here retries: failures surface to the caller, and a failed
//! rebuild is left for the caller to re-run.

use tantivy::TantivyError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Error types for search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Profile missing, malformed, or referencing an unknown attribute
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Index store cannot be opened or created
    #[error("Search index unavailable at {path}: {message}")]
    IndexUnavailable { path: String, message: String },

    /// Query text rejected by the query parser
    #[error("Invalid search query '{query}': {message}")]
    QueryParse { query: String, message: String },

    /// Record store failed to enumerate or read records
    #[error("Record store error: {0}")]
    Store(String),

    /// Index write failed (add, delete, or commit)
    #[error("Index write failed for {target}: {message}")]
    Write { target: String, message: String },

    /// Background change queue stopped or is saturated
    #[error("Change queue unavailable: {0}")]
    QueueUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tantivy error wrapper
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),
}

impl From<ConfigError> for SearchError {
    fn from(error: ConfigError) -> Self {
        SearchError::Configuration(error.to_string())
    }
}

impl SearchError {
    pub(crate) fn store(error: anyhow::Error) -> Self {
        SearchError::Store(format!("{error:#}"))
    }

    pub(crate) fn write(target: impl Into<String>, error: impl std::fmt::Display) -> Self {
        SearchError::Write {
            target: target.into(),
            message: error.to_string(),
        }
    }

    /// Check if the error prevents any further use of the index handle
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::IndexUnavailable { .. })
    }

    /// Check if index rebuild is recommended
    ///
    /// A write failure mid-rebuild leaves already committed documents in
    /// place, so the index no longer mirrors the store.
    #[must_use]
    pub fn needs_index_rebuild(&self) -> bool {
        matches!(
            self,
            SearchError::Write { .. } | SearchError::Tantivy(TantivyError::DataCorruption(_))
        )
    }
}

/// Helper macro for logging search operations with performance metrics
#[macro_export]
macro_rules! log_search_operation {
    ($op:expr, $query:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(
                    query = %$query,
                    duration_ms = duration.as_millis(),
                    "Search operation completed successfully"
                );
            }
            Err(e) => {
                tracing::error!(
                    query = %$query,
                    duration_ms = duration.as_millis(),
                    error = %e,
                    "Search operation failed"
                );
            }
        }

        result
    }};
}
