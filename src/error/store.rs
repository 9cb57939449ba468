use super::IsRetryable;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StoreError {
    /// The record changed between read and write.
    #[error("shared record {namespace}/{name} was modified concurrently (expected version {expected})")]
    Conflict {
        namespace: String,
        name: String,
        expected: u64,
    },

    #[error("shared record {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IsRetryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
