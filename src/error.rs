use thiserror::Error;

/// Failures a search request can end in. Display strings are the messages
/// returned to clients.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Search system not properly initialized. Please check server logs.")]
    IndexUnavailable,

    #[error("Failed to generate query embedding. Please try again.")]
    Embedding(anyhow::Error),

    #[error("Query embedding has {actual} dimensions but the index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to retrieve hostel details")]
    RecordStore(anyhow::Error),
}

impl SearchError {
    /// True for caller mistakes, false for failures on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::EmptyQuery)
    }
}
