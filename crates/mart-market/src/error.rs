//! Error types for mart-market.

use mart_core::{AccountKey, CoreError, ErrorKind};
use mart_ledger::LedgerError;
use mart_store::StoreError;
use thiserror::Error;

/// Result type alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur in marketplace operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Signature did not verify for the claimed signer.
    #[error("signature verification failed for {signer}")]
    Authentication {
        /// The claimed signer.
        signer: AccountKey,
    },

    /// The signer is neither party to the trade.
    #[error("{actor} is not a party to trade {trade}")]
    NotAParty {
        /// The signer.
        actor: AccountKey,
        /// The trade.
        trade: String,
    },

    /// Trade not found.
    #[error("trade not found: {0}")]
    TradeNotFound(String),

    /// Listing not found.
    #[error("listing not found: {0}")]
    ListingNotFound(String),

    /// User not registered.
    #[error("user not found: {0}")]
    UserNotFound(AccountKey),

    /// No matching engine registered under this id.
    #[error("unknown matcher: {0}")]
    UnknownMatcher(String),

    /// Invalid trade state transition.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Account ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Collaborator or primitive failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MarketError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(signer: &AccountKey) -> Self {
        Self::Authentication {
            signer: signer.clone(),
        }
    }

    /// The taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::Authentication { .. } | Self::NotAParty { .. } => ErrorKind::Authentication,
            Self::TradeNotFound(_)
            | Self::ListingNotFound(_)
            | Self::UserNotFound(_)
            | Self::UnknownMatcher(_) => ErrorKind::NotFound,
            Self::InvalidStateTransition { .. } => ErrorKind::StateConflict,
            Self::Ledger(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Core(err) => err.kind(),
        }
    }

    /// True only for optimistic-concurrency aborts.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}
