use thiserror::Error;

use crate::query::ValidationError;

/// Errors returned by the search service and saved search storage.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("not authorized to access catalog {catalog}")]
    NotAuthorized { catalog: String },

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("stored query is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl SearchError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        SearchError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the error was caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::Validation(_) | SearchError::NotFound { .. } | SearchError::NotAuthorized { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
