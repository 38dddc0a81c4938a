//! Identity/Registry contract.
//!
//! The ledger asks the registry whether an account exists before moving
//! funds for it. The registry answers with the account's role attributes
//! or `None` when the account was never registered.

use serde::{Deserialize, Serialize};

use crate::{AccountKey, CoreError};

/// What a registered account may do in the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Buys from listings.
    Consumer,
    /// Publishes listings; also allowed to buy.
    Business {
        /// Registered company name.
        company_name: String,
    },
}

impl Role {
    /// True for business accounts.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }
}

/// A registry answer for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The account.
    pub account: AccountKey,
    /// Role attributes.
    pub role: Role,
}

/// Existence and role lookup for accounts.
pub trait Registry: Send + Sync {
    /// Look up an account.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Unavailable` when the registry cannot answer.
    fn lookup(&self, account: &AccountKey) -> Result<Option<Identity>, CoreError>;
}
