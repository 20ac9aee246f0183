// Error types module
use thiserror::Error;

use tabcoin_store::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TabcoinError>;

/// Main error type for the ledger engine.
#[derive(Error, Debug)]
pub enum TabcoinError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Id generation error: {0}")]
    InvalidId(String),
}

impl TabcoinError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        TabcoinError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        TabcoinError::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        TabcoinError::Conflict(msg.into())
    }

    /// True for contention outcomes a caller recovers from silently:
    /// a snapshot-isolation write conflict, or a reward claim that lost to
    /// a concurrent evaluation. The reward engine maps these to "granted 0"
    /// instead of surfacing them.
    pub fn is_benign_conflict(&self) -> bool {
        match self {
            TabcoinError::Conflict(_) => true,
            TabcoinError::Storage(e) => e.is_serialization_failure(),
            _ => false,
        }
    }
}
