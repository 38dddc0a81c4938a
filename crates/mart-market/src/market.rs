//! The marketplace service.
//!
//! [`Marketplace`] is what an outer transport calls. Each public method runs
//! as one transaction against the shared store: it commits if every step
//! succeeds and leaves no trace otherwise. Conflicts are returned to the
//! caller, never retried here.

use std::fmt;
use std::sync::Arc;

use mart_core::{AccountKey, Amount, Ed25519Verifier, Registry, SignatureVerifier};
use mart_ledger::{AccountBalance, AccountLedger};
use mart_store::{LedgerStore, Transaction};
use tracing::{info, warn};

use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::listing::{Listing, ListingBoard, ListingDraft, ListingId, ListingService};
use crate::matching::{MatchQuery, MatchResult, MatcherRegistry};
use crate::trade::{Trade, TradeId};
use crate::trades::TradeLedger;
use crate::user::{UserProfile, UserRecord, UserRegistry};

/// Result of [`Marketplace::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarding {
    /// The stored registration.
    pub record: UserRecord,
    /// Tokens minted by this registration, if it was the first.
    pub granted: Option<Amount>,
}

/// Marketplace settlement service.
pub struct Marketplace {
    store: Arc<dyn LedgerStore>,
    config: MarketConfig,
    verifier: Arc<dyn SignatureVerifier>,
    registry: Option<Arc<dyn Registry>>,
    listing_service: Option<Arc<dyn ListingService>>,
    matchers: Arc<MatcherRegistry>,
}

impl fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marketplace")
            .field("config", &self.config)
            .field("matchers", &self.matchers)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Create a marketplace over `store` with Ed25519 verification and the
    /// built-in user registry, listing board and matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(store: Arc<dyn LedgerStore>, config: MarketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            verifier: Arc::new(Ed25519Verifier),
            registry: None,
            listing_service: None,
            matchers: Arc::new(MatcherRegistry::default()),
        })
    }

    /// Use a different signature verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Answer existence checks from `registry` instead of the user registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Resolve trade subjects through `service` instead of the listing board.
    #[must_use]
    pub fn with_listing_service(mut self, service: Arc<dyn ListingService>) -> Self {
        self.listing_service = Some(service);
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Registered matching engines.
    #[must_use]
    pub fn matchers(&self) -> &MatcherRegistry {
        &self.matchers
    }

    // --- users -----------------------------------------------------------

    /// Register or update a user; the first registration mints the
    /// onboarding grant in the same transaction.
    ///
    /// # Errors
    ///
    /// `Authentication` or `Validation` from the user registry, or a store
    /// failure.
    pub fn register(&self, account: &AccountKey, profile: UserProfile, signature: &[u8]) -> Result<Onboarding> {
        let users = self.users();
        let accounts = self.accounts();
        let grant = self.config.onboarding_grant;

        let onboarding = self.execute(|tx| {
            let registration = users.register(tx, account, profile, signature)?;
            let granted = if registration.first && !grant.is_zero() {
                accounts.mint(tx, account, grant)?;
                Some(grant)
            } else {
                None
            };
            Ok(Onboarding {
                record: registration.record,
                granted,
            })
        })?;

        info!(
            account = %account,
            business = onboarding.record.role.is_business(),
            granted = onboarding.granted.map_or(0, Amount::tokens),
            "user registered"
        );
        Ok(onboarding)
    }

    /// Look up a user's registration.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the account never registered.
    pub fn user(&self, account: &AccountKey) -> Result<UserRecord> {
        let users = self.users();
        self.execute(|tx| {
            users
                .get(tx, account)?
                .ok_or_else(|| MarketError::UserNotFound(account.clone()))
        })
    }

    // --- listings --------------------------------------------------------

    /// Publish a listing signed by a business.
    ///
    /// # Errors
    ///
    /// See [`ListingBoard::publish`].
    pub fn publish(&self, owner: &AccountKey, draft: ListingDraft, signature: &[u8]) -> Result<Listing> {
        let board = self.board();
        let listing = self.execute(|tx| board.publish(tx, owner, draft, signature))?;
        info!(listing = %listing.id, owner = %owner, price = %listing.price, city = %listing.city, "listing published");
        Ok(listing)
    }

    /// Look up one listing.
    ///
    /// # Errors
    ///
    /// Returns `ListingNotFound` if absent.
    pub fn listing(&self, id: &ListingId) -> Result<Listing> {
        let board = self.board();
        self.execute(|tx| board.get(tx, id))
    }

    /// Listings published by `owner`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn listings_by_owner(&self, owner: &AccountKey) -> Result<Vec<Listing>> {
        let board = self.board();
        self.execute(|tx| board.by_owner(tx, owner))
    }

    /// Every listing.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn all_listings(&self) -> Result<Vec<Listing>> {
        let board = self.board();
        self.execute(|tx| board.all(tx))
    }

    /// Match listings against `query` with the named engine, or the
    /// configured default.
    ///
    /// # Errors
    ///
    /// See [`ListingBoard::matching`].
    pub fn matching(&self, matcher: Option<&str>, query: &MatchQuery) -> Result<MatchResult> {
        let board = self.board();
        self.execute(|tx| board.matching(tx, matcher, query))
    }

    // --- accounts --------------------------------------------------------

    /// Credit `amount` to `account`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on overflow, or a store failure.
    pub fn mint(&self, account: &AccountKey, amount: Amount) -> Result<AccountBalance> {
        let accounts = self.accounts();
        let balance = self.execute(|tx| Ok(accounts.mint(tx, account, amount)?))?;
        info!(account = %account, amount = %amount, "tokens minted");
        Ok(balance)
    }

    /// Escrow `amount` of `account`'s available funds.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InsufficientBalance` from the account ledger.
    pub fn freeze(&self, account: &AccountKey, amount: Amount) -> Result<AccountBalance> {
        let accounts = self.accounts();
        let balance = self.execute(|tx| Ok(accounts.freeze(tx, account, amount)?))?;
        info!(account = %account, amount = %amount, "funds frozen");
        Ok(balance)
    }

    /// Pay `amount` of `from`'s frozen funds to `to`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InsufficientFrozen` from the account ledger.
    pub fn settle(&self, from: &AccountKey, to: &AccountKey, amount: Amount) -> Result<()> {
        let accounts = self.accounts();
        self.execute(|tx| Ok(accounts.settle(tx, from, to, amount)?))?;
        info!(from = %from, to = %to, amount = %amount, "funds settled");
        Ok(())
    }

    /// Current `(available, frozen)` of `account`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account was never minted into.
    pub fn balance(&self, account: &AccountKey) -> Result<AccountBalance> {
        let accounts = self.accounts();
        self.execute(|tx| Ok(accounts.balance(tx, account)?))
    }

    // --- trades ----------------------------------------------------------

    /// Open a trade. `signature` covers the subject id string.
    ///
    /// # Errors
    ///
    /// See [`TradeLedger::submit`].
    pub fn submit(&self, consumer: &AccountKey, subject: &ListingId, signature: &[u8]) -> Result<Trade> {
        let trades = self.trades();
        let trade = self.execute(|tx| trades.submit(tx, consumer, subject, signature))?;
        info!(
            trade = %trade.id,
            consumer = %trade.consumer,
            counterparty = %trade.counterparty,
            price = %trade.price,
            "trade submitted"
        );
        Ok(trade)
    }

    /// Confirm a trade. `signature` covers the trade id string.
    ///
    /// # Errors
    ///
    /// See [`TradeLedger::confirm`].
    pub fn confirm(&self, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        let trades = self.trades();
        let trade = self.execute(|tx| trades.confirm(tx, actor, id, signature))?;
        info!(trade = %trade.id, actor = %actor, "trade confirmed");
        Ok(trade)
    }

    /// Finish a trade, paying the counterparty.
    ///
    /// # Errors
    ///
    /// See [`TradeLedger::finish`].
    pub fn finish(&self, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        let trades = self.trades();
        let trade = self.execute(|tx| trades.finish(tx, actor, id, signature))?;
        info!(trade = %trade.id, actor = %actor, price = %trade.price, "trade finished");
        Ok(trade)
    }

    /// Cancel a trade, refunding the consumer.
    ///
    /// # Errors
    ///
    /// See [`TradeLedger::cancel`].
    pub fn cancel(&self, actor: &AccountKey, id: &TradeId, signature: &[u8]) -> Result<Trade> {
        let trades = self.trades();
        let trade = self.execute(|tx| trades.cancel(tx, actor, id, signature))?;
        info!(trade = %trade.id, actor = %actor, price = %trade.price, "trade cancelled");
        Ok(trade)
    }

    /// Look up one trade.
    ///
    /// # Errors
    ///
    /// Returns `TradeNotFound` if absent.
    pub fn trade(&self, id: &TradeId) -> Result<Trade> {
        let trades = self.trades();
        self.execute(|tx| trades.get(tx, id))
    }

    /// Trades where `account` is the consumer.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn trades_by_consumer(&self, account: &AccountKey) -> Result<Vec<Trade>> {
        let trades = self.trades();
        self.execute(|tx| trades.by_consumer(tx, account))
    }

    /// Trades where `account` is the counterparty.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn trades_by_counterparty(&self, account: &AccountKey) -> Result<Vec<Trade>> {
        let trades = self.trades();
        self.execute(|tx| trades.by_counterparty(tx, account))
    }

    // --- wiring ----------------------------------------------------------

    fn execute<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let result = mart_store::execute(self.store.as_ref(), f);
        if let Err(err) = &result {
            warn!(kind = %err.kind(), retryable = err.is_retryable(), error = %err, "request rejected");
        }
        result
    }

    fn users(&self) -> UserRegistry {
        UserRegistry::new(Arc::clone(&self.store), Arc::clone(&self.verifier))
    }

    fn registry(&self) -> Arc<dyn Registry> {
        match &self.registry {
            Some(registry) => Arc::clone(registry),
            None => Arc::new(self.users()),
        }
    }

    fn board(&self) -> ListingBoard {
        ListingBoard::new(
            Arc::clone(&self.store),
            self.registry(),
            Arc::clone(&self.verifier),
            Arc::clone(&self.matchers),
            self.config.default_matcher.clone(),
        )
    }

    fn accounts(&self) -> AccountLedger {
        AccountLedger::new(self.registry())
    }

    fn trades(&self) -> TradeLedger {
        let listings: Arc<dyn ListingService> = match &self.listing_service {
            Some(service) => Arc::clone(service),
            None => Arc::new(self.board()),
        };
        TradeLedger::new(self.accounts(), Arc::clone(&self.verifier), listings, self.config.clone())
    }
}
