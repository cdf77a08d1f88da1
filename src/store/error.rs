//! Storage backend error types
//!
//! Defines all errors that can occur in the storage layer.

use thiserror::Error;

/// Errors that can occur in a storage backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Value could not be encoded for storage or decoded from it
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend rejected a write due to capacity limits
    #[error("Quota exceeded: {0} bytes used, {1} bytes allowed")]
    QuotaExceeded(u64, u64),

    /// The backend cannot be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
