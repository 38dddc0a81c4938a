//! Per-account available/frozen balances.
//!
//! Each account owns two store keys, `<account>_coin` (available) and
//! `<account>_coin_freeze` (frozen), holding JSON-encoded token counts.
//! Every operation stages its writes into the caller's [`Transaction`], so a
//! freeze or settle commits together with whatever else the caller writes.

use std::fmt;
use std::sync::Arc;

use mart_core::{AccountKey, Amount, Registry};
use mart_store::Transaction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, Result};

/// Store key of an account's available balance.
#[must_use]
pub fn available_key(account: &AccountKey) -> String {
    format!("{account}_coin")
}

/// Store key of an account's frozen balance.
#[must_use]
pub fn frozen_key(account: &AccountKey) -> String {
    format!("{account}_coin_freeze")
}

/// An account's balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Spendable tokens.
    pub available: Amount,
    /// Tokens reserved pending settlement.
    pub frozen: Amount,
}

impl AccountBalance {
    /// `available + frozen`, or `None` on overflow.
    #[must_use]
    pub const fn total(&self) -> Option<Amount> {
        self.available.checked_add(self.frozen)
    }
}

/// The account ledger.
///
/// Holds no state of its own; balances live in the store and existence is
/// answered by the injected [`Registry`].
#[derive(Clone)]
pub struct AccountLedger {
    registry: Arc<dyn Registry>,
}

impl fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountLedger").finish_non_exhaustive()
    }
}

impl AccountLedger {
    /// Create a ledger that checks account existence against `registry`.
    #[must_use]
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Credit `amount` to `account`'s available balance.
    ///
    /// Trusted internal call: no existence check. The first mint establishes
    /// the account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Overflow` if the balance would overflow, or a
    /// store error.
    pub fn mint(&self, tx: &mut Transaction<'_>, account: &AccountKey, amount: Amount) -> Result<AccountBalance> {
        let available = read(tx, &available_key(account))?.unwrap_or(Amount::ZERO);
        let frozen = read(tx, &frozen_key(account))?.unwrap_or(Amount::ZERO);
        let available = credit(account, available, amount)?;

        tx.put_json(available_key(account), &available)?;
        debug!(account = %account, amount = %amount, "mint staged");
        Ok(AccountBalance { available, frozen })
    }

    /// Move `amount` from available to frozen.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the registry does not know
    /// the account, `LedgerError::InsufficientBalance` if
    /// `available < amount`. Nothing is staged on error.
    pub fn freeze(&self, tx: &mut Transaction<'_>, account: &AccountKey, amount: Amount) -> Result<AccountBalance> {
        self.require_exists(account)?;
        let mut balance = read_balance(tx, account)?;

        balance.available = balance
            .available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::insufficient_balance(account, balance.available, amount))?;
        balance.frozen = credit(account, balance.frozen, amount)?;

        write_balance(tx, account, balance)?;
        debug!(account = %account, amount = %amount, "freeze staged");
        Ok(balance)
    }

    /// Release `amount` of `from`'s frozen funds into `to`'s available balance.
    ///
    /// An account that is registered but was never minted into starts at zero.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if either account is unknown,
    /// `LedgerError::InsufficientFrozen` if `from.frozen < amount`. Nothing is
    /// staged on error.
    pub fn settle(&self, tx: &mut Transaction<'_>, from: &AccountKey, to: &AccountKey, amount: Amount) -> Result<()> {
        self.require_exists(from)?;
        self.require_exists(to)?;

        let frozen = read(tx, &frozen_key(from))?.unwrap_or(Amount::ZERO);
        let frozen = frozen
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::insufficient_frozen(from, frozen, amount))?;
        let available = read(tx, &available_key(to))?.unwrap_or(Amount::ZERO);
        let available = credit(to, available, amount)?;

        tx.put_json(frozen_key(from), &frozen)?;
        tx.put_json(available_key(to), &available)?;

        debug!(from = %from, to = %to, amount = %amount, "settle staged");
        Ok(())
    }

    /// Return `amount` of `account`'s frozen funds to its own available balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` or
    /// `LedgerError::InsufficientFrozen`. Nothing is staged on error.
    pub fn refund(&self, tx: &mut Transaction<'_>, account: &AccountKey, amount: Amount) -> Result<AccountBalance> {
        self.require_exists(account)?;
        let mut balance = read_balance(tx, account)?;

        balance.frozen = balance
            .frozen
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::insufficient_frozen(account, balance.frozen, amount))?;
        balance.available = credit(account, balance.available, amount)?;

        write_balance(tx, account, balance)?;
        debug!(account = %account, amount = %amount, "refund staged");
        Ok(balance)
    }

    /// Current balances of `account`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the account was never
    /// minted into.
    pub fn balance(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<AccountBalance> {
        let available = read(tx, &available_key(account))?.ok_or_else(|| LedgerError::not_found(account))?;
        let frozen = read(tx, &frozen_key(account))?.unwrap_or(Amount::ZERO);
        Ok(AccountBalance { available, frozen })
    }

    fn require_exists(&self, account: &AccountKey) -> Result<()> {
        match self.registry.lookup(account)? {
            Some(_) => Ok(()),
            None => {
                debug!(account = %account, "account not registered");
                Err(LedgerError::not_found(account))
            }
        }
    }
}

fn read(tx: &mut Transaction<'_>, key: &str) -> Result<Option<Amount>> {
    Ok(tx.get_json(key)?)
}

fn read_balance(tx: &mut Transaction<'_>, account: &AccountKey) -> Result<AccountBalance> {
    Ok(AccountBalance {
        available: read(tx, &available_key(account))?.unwrap_or(Amount::ZERO),
        frozen: read(tx, &frozen_key(account))?.unwrap_or(Amount::ZERO),
    })
}

fn write_balance(tx: &mut Transaction<'_>, account: &AccountKey, balance: AccountBalance) -> Result<()> {
    tx.put_json(available_key(account), &balance.available)?;
    tx.put_json(frozen_key(account), &balance.frozen)?;
    Ok(())
}

fn credit(account: &AccountKey, current: Amount, amount: Amount) -> Result<Amount> {
    current.checked_add(amount).ok_or_else(|| LedgerError::Overflow {
        account: account.clone(),
    })
}
