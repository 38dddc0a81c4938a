//! Error types for mart-core and the shared error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of failure a marketplace operation reports to its caller.
///
/// Every error type in the workspace maps onto exactly one kind, so an
/// outer transport can distinguish failures without matching on crate
/// specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing fields, out-of-range bounds.
    Validation,
    /// A signature did not verify.
    Authentication,
    /// An account, trade or listing is absent.
    NotFound,
    /// Spendable balance too low for a freeze.
    InsufficientBalance,
    /// Frozen balance too low for a settle or refund.
    InsufficientFrozen,
    /// A trade is not in the state the transition requires.
    StateConflict,
    /// A collaborator call failed.
    Downstream,
    /// The store rejected the commit.
    WriteFailure,
}

impl ErrorKind {
    /// Short machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InsufficientFrozen => "insufficient_frozen",
            Self::StateConflict => "state_conflict",
            Self::Downstream => "downstream",
            Self::WriteFailure => "write_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid amount (overflow, underflow, negative or unparsable).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Account key is not a base58-encoded 32-byte public key.
    #[error("invalid account key: {0}")]
    InvalidKey(String),

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// A collaborator service could not answer.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// Name of the collaborator.
        service: String,
        /// What went wrong.
        message: String,
    },
}

impl CoreError {
    /// Create a collaborator-unavailable error.
    #[must_use]
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// The taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::InvalidKey(_) => ErrorKind::Validation,
            Self::Crypto(_) | Self::InvalidSignature => ErrorKind::Authentication,
            Self::Unavailable { .. } => ErrorKind::Downstream,
        }
    }
}
