//! Storage layer errors.

use mart_core::ErrorKind;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key read by the transaction was changed by a concurrent commit.
    #[error("commit conflict on key {key:?}")]
    Conflict {
        /// The first key found invalidated.
        key: String,
    },

    /// The backend refused or failed the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A composite key component was malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Snapshot file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value or snapshot could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes did not decode as the expected record.
    #[error("corrupt record at {key:?}: {source}")]
    Corrupt {
        /// Key or snapshot path that failed to decode.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a conflict error.
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Create a decode failure for `key`.
    pub fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            key: key.into(),
            source,
        }
    }

    /// The taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey(_) => ErrorKind::Validation,
            // The backend answered, but with bytes nothing can read.
            Self::Corrupt { .. } => ErrorKind::Downstream,
            Self::Conflict { .. }
            | Self::Unavailable(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::WriteFailure,
        }
    }

    /// Only optimistic-concurrency aborts succeed when retried unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
