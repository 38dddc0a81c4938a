//! Trade ledger: drives the trade state machine and the escrow it implies.
//!
//! | operation | from | to | funds |
//! |---|---|---|---|
//! | `submit` | - | Submitted | `freeze(consumer, price)` |
//! | `confirm` | Submitted | Confirmed | - |
//! | `finish` | Submitted (branching) / Confirmed (sequential) | Finished | `settle(consumer, counterparty, price)` |
//! | `cancel` | Submitted, or Confirmed (sequential) | Cancelled | `refund(consumer, price)` |
//!
//! Every check runs before the first write, and all writes land in the
//! caller's transaction.

use std::fmt;
use std::sync::Arc;

use mart_core::{AccountKey, SignatureVerifier};
use mart_ledger::AccountLedger;
use mart_store::Transaction;
use tracing::{debug, warn};

use crate::book::TradeBook;
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::listing::{ListingId, ListingService};
use crate::trade::{Trade, TradeId, TradeState};

/// The trade ledger.
#[derive(Clone)]
pub struct TradeLedger {
    accounts: AccountLedger,
    verifier: Arc<dyn SignatureVerifier>,
    listings: Arc<dyn ListingService>,
    config: MarketConfig,
    book: TradeBook,
}

impl fmt::Debug for TradeLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeLedger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TradeLedger {
    /// Create a trade ledger over its collaborators.
    #[must_use]
    pub fn new(
        accounts: AccountLedger,
        verifier: Arc<dyn SignatureVerifier>,
        listings: Arc<dyn ListingService>,
        config: MarketConfig,
    ) -> Self {
        Self {
            accounts,
            verifier,
            listings,
            config,
            book: TradeBook,
        }
    }

    /// Open a trade against `subject`, escrowing its price.
    ///
    /// `signature` must be `consumer`'s signature over the subject id string.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the signature does not verify
    /// - `ListingNotFound` if the subject does not resolve
    /// - the account ledger's error if the freeze fails
    pub fn submit(
        &self,
        tx: &mut Transaction<'_>,
        consumer: &AccountKey,
        subject: &ListingId,
        signature: &[u8],
    ) -> Result<Trade> {
        self.authenticate(consumer, subject.to_string().as_bytes(), signature)?;

        let quote = self
            .listings
            .resolve(subject)?
            .ok_or_else(|| MarketError::ListingNotFound(subject.to_string()))?;

        self.accounts.freeze(tx, consumer, quote.price)?;

        let trade = Trade::submitted(
            TradeId::new(consumer.clone(), tx.id().as_str()),
            quote.owner,
            subject.clone(),
            quote.title,
            quote.price,
            tx.timestamp(),
        );
        self.book.write(tx, &trade)?;

        debug!(trade = %trade.id, price = %trade.price, "submit staged");
        Ok(trade)
    }

    /// Accept a submitted trade.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the signature over the trade id does not verify
    /// - `TradeNotFound` if there is no such trade
    /// - `InvalidStateTransition` if the trade is not `Submitted`
    pub fn confirm(&self, tx: &mut Transaction<'_>, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        let mut trade = self.load_for(tx, actor, id, signature)?;
        trade.confirm(self.config.finish_policy, tx.timestamp())?;
        self.book.write(tx, &trade)?;
        debug!(trade = %trade.id, "confirm staged");
        Ok(trade)
    }

    /// Pay the escrowed price to the counterparty.
    ///
    /// # Errors
    ///
    /// As [`confirm`](Self::confirm), with the required state set by the
    /// finish policy, plus the account ledger's error if the settle fails.
    pub fn finish(&self, tx: &mut Transaction<'_>, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        let policy = self.config.finish_policy;
        let mut trade = self.load_for(tx, actor, id, signature)?;
        trade.check_transition(TradeState::Finished, policy)?;

        self.accounts.settle(tx, &trade.consumer, &trade.counterparty, trade.price)?;

        trade.finish(policy, tx.timestamp())?;
        self.book.write(tx, &trade)?;
        debug!(trade = %trade.id, "finish staged");
        Ok(trade)
    }

    /// Return the escrowed price to the consumer.
    ///
    /// # Errors
    ///
    /// `Validation` when cancelling is disabled, otherwise as
    /// [`finish`](Self::finish).
    pub fn cancel(&self, tx: &mut Transaction<'_>, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        if !self.config.allow_cancel {
            return Err(MarketError::validation("cancel is disabled"));
        }
        let policy = self.config.finish_policy;
        let mut trade = self.load_for(tx, actor, id, signature)?;
        trade.check_transition(TradeState::Cancelled, policy)?;

        self.accounts.refund(tx, &trade.consumer, trade.price)?;

        trade.cancel(policy, tx.timestamp())?;
        self.book.write(tx, &trade)?;
        debug!(trade = %trade.id, "cancel staged");
        Ok(trade)
    }

    /// Look up one trade.
    ///
    /// # Errors
    ///
    /// Returns `TradeNotFound` if absent.
    pub fn get(&self, tx: &mut Transaction<'_>, id: &TradeId) -> Result<Trade> {
        self.book
            .get(tx, id)?
            .ok_or_else(|| MarketError::TradeNotFound(id.to_string()))
    }

    /// Trades where `account` paid.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn by_consumer(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<Vec<Trade>> {
        self.book.by_consumer(tx, account)
    }

    /// Trades where `account` is paid.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn by_counterparty(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<Vec<Trade>> {
        self.book.by_counterparty(tx, account)
    }

    fn authenticate(&self, signer: &AccountKey, message: &[u8], signature: &[u8]) -> Result<()> {
        if self.verifier.verify(signer, message, signature) {
            Ok(())
        } else {
            warn!(signer = %signer, "trade signature rejected");
            Err(MarketError::authentication(signer))
        }
    }

    fn load_for(&self, tx: &mut Transaction<'_>, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        self.authenticate(actor, id.to_string().as_bytes(), signature)?;
        let trade = self.get(tx, id)?;
        if self.config.require_party_signer && !trade.is_party(actor) {
            return Err(MarketError::NotAParty {
                actor: actor.clone(),
                trade: id.to_string(),
            });
        }
        Ok(trade)
    }
}
