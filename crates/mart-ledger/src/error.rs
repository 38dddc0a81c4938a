//! Error types for account ledger operations.

use mart_core::{AccountKey, Amount, CoreError, ErrorKind};
use mart_store::StoreError;
use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The registry does not know the account, or it was never minted into.
    #[error("account not found: {account}")]
    AccountNotFound {
        /// The missing account.
        account: AccountKey,
    },

    /// Available balance is below the requested amount.
    #[error("insufficient balance: {account} has {available} available, need {requested}")]
    InsufficientBalance {
        /// The account.
        account: AccountKey,
        /// Current available balance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Frozen balance is below the requested amount.
    #[error("insufficient frozen: {account} has {frozen} frozen, need {requested}")]
    InsufficientFrozen {
        /// The account.
        account: AccountKey,
        /// Current frozen balance.
        frozen: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Crediting would exceed the representable balance.
    #[error("balance overflow on {account}")]
    Overflow {
        /// The account.
        account: AccountKey,
    },

    /// A collaborator call failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Create an account-not-found error.
    #[must_use]
    pub fn not_found(account: &AccountKey) -> Self {
        Self::AccountNotFound {
            account: account.clone(),
        }
    }

    /// Create an insufficient balance error.
    #[must_use]
    pub fn insufficient_balance(account: &AccountKey, available: Amount, requested: Amount) -> Self {
        Self::InsufficientBalance {
            account: account.clone(),
            available,
            requested,
        }
    }

    /// Create an insufficient frozen error.
    #[must_use]
    pub fn insufficient_frozen(account: &AccountKey, frozen: Amount, requested: Amount) -> Self {
        Self::InsufficientFrozen {
            account: account.clone(),
            frozen,
            requested,
        }
    }

    /// The taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::InsufficientFrozen { .. } => ErrorKind::InsufficientFrozen,
            Self::Overflow { .. } => ErrorKind::Validation,
            Self::Core(err) => err.kind(),
            Self::Store(err) => err.kind(),
        }
    }

    /// True only for commit conflicts.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}
