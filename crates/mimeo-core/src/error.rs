//! Error types for mimeo.

use thiserror::Error;

/// Result type alias using mimeo's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mimeo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input or malformed data; never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Content record not found
    #[error("Content not found: {0}")]
    ContentNotFound(uuid::Uuid),

    /// User record not found
    #[error("User not found: {0}")]
    UserNotFound(uuid::Uuid),

    /// Style delta extraction failed (transient failures exhausted)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Underlying document-store failure, surfaced unchanged
    #[error("Storage error: {0}")]
    Storage(String),

    /// Optimistic-concurrency conflict on a user record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retrying caller may attempt this operation again.
    ///
    /// Validation and not-found failures are terminal; storage errors carry
    /// their own retry policy in the storage client and are not retried here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Extraction(_) | Error::Conflict(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
