//! # mart-ledger
//!
//! The account ledger: per-account available and frozen token balances.
//!
//! This crate provides:
//! - [`AccountLedger::mint`] - credit available funds, establishing the account
//! - [`AccountLedger::freeze`] - escrow available funds
//! - [`AccountLedger::settle`] - pay frozen funds to a counterparty
//! - [`AccountLedger::refund`] - return frozen funds to their owner
//! - [`AccountLedger::balance`] - read `(available, frozen)`
//!
//! Every operation stages writes into a caller-owned
//! [`mart_store::Transaction`]; the caller decides when to commit.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mart_core::{AccountKey, Amount, CoreError, Identity, Registry, Role, Wallet};
//! use mart_ledger::AccountLedger;
//! use mart_store::{MemoryStore, execute};
//!
//! struct Everyone;
//!
//! impl Registry for Everyone {
//!     fn lookup(&self, account: &AccountKey) -> Result<Option<Identity>, CoreError> {
//!         Ok(Some(Identity { account: account.clone(), role: Role::Consumer }))
//!     }
//! }
//!
//! let store = MemoryStore::new();
//! let ledger = AccountLedger::new(Arc::new(Everyone));
//! let alice = Wallet::new().account();
//!
//! execute(&store, |tx| ledger.mint(tx, &alice, Amount::new(100))).unwrap();
//! execute(&store, |tx| ledger.freeze(tx, &alice, Amount::new(40))).unwrap();
//!
//! let balance = execute(&store, |tx| ledger.balance(tx, &alice)).unwrap();
//! assert_eq!(balance.available, Amount::new(60));
//! assert_eq!(balance.frozen, Amount::new(40));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::{AccountBalance, AccountLedger, available_key, frozen_key};
