//! Listing board: business offers that trades are placed against.
//!
//! Listings are stored under `("listing", owner, tx id)` so every owner's
//! offers can be range-scanned. A listing is immutable once published.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mart_core::{AccountKey, Amount, CoreError, Registry, Role, SignatureVerifier};
use mart_store::{LedgerStore, SecondaryIndex, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MarketError, Result};
use crate::matching::{MatchQuery, MatchResult, MatcherRegistry};

/// Listings by owner.
pub const LISTINGS: SecondaryIndex = SecondaryIndex::new("listing");

/// Identifies a listing: its owner plus the publishing transaction.
///
/// Rendered as `<owner>:<tx id>`; this string is the subject reference a
/// consumer signs when submitting a trade.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListingId {
    owner: AccountKey,
    tx: String,
}

impl ListingId {
    /// Build a listing id.
    #[must_use]
    pub fn new(owner: AccountKey, tx: impl Into<String>) -> Self {
        Self { owner, tx: tx.into() }
    }

    /// The publishing business.
    #[must_use]
    pub const fn owner(&self) -> &AccountKey {
        &self.owner
    }

    /// The publishing transaction id.
    #[must_use]
    pub fn tx(&self) -> &str {
        &self.tx
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.tx)
    }
}

impl FromStr for ListingId {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, tx) = s
            .split_once(':')
            .filter(|(_, tx)| !tx.is_empty())
            .ok_or_else(|| MarketError::validation(format!("malformed listing id: {s}")))?;
        let owner = AccountKey::from_base58(owner)
            .map_err(|e| MarketError::validation(format!("malformed listing id: {e}")))?;
        Ok(Self::new(owner, tx))
    }
}

impl TryFrom<String> for ListingId {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ListingId> for String {
    fn from(id: ListingId) -> Self {
        id.to_string()
    }
}

/// What a business submits to publish a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    /// Short title.
    pub title: String,
    /// Description.
    pub content: String,
    /// City the service is offered in.
    pub city: String,
    /// Asking price.
    pub price: Amount,
}

impl ListingDraft {
    /// The bytes the owner signs: the draft's JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft cannot be encoded.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| MarketError::validation(format!("unencodable listing: {e}")))
    }

    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("title", &self.title), ("content", &self.content), ("city", &self.city)] {
            if value.trim().is_empty() {
                return Err(MarketError::validation(format!("listing {field} is required")));
            }
        }
        Ok(())
    }
}

/// A published listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing identifier.
    pub id: ListingId,
    /// Publishing business.
    pub owner: AccountKey,
    /// Owner's registered company name.
    pub company_name: String,
    /// Short title.
    pub title: String,
    /// Description.
    pub content: String,
    /// City the service is offered in.
    pub city: String,
    /// Asking price.
    pub price: Amount,
    /// Publish time.
    pub published_at: DateTime<Utc>,
}

/// What the trade ledger needs to know about a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Account that receives payment.
    pub owner: AccountKey,
    /// Price to escrow.
    pub price: Amount,
    /// Title captured on the trade.
    pub title: String,
}

/// Price and ownership lookup for a trade subject.
pub trait ListingService: Send + Sync {
    /// Resolve a subject, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Unavailable` when the service cannot answer.
    fn resolve(&self, subject: &ListingId) -> std::result::Result<Option<Quote>, CoreError>;
}

/// Publishes and serves listings.
pub struct ListingBoard {
    store: Arc<dyn LedgerStore>,
    registry: Arc<dyn Registry>,
    verifier: Arc<dyn SignatureVerifier>,
    matchers: Arc<MatcherRegistry>,
    default_matcher: String,
}

impl fmt::Debug for ListingBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingBoard")
            .field("default_matcher", &self.default_matcher)
            .finish_non_exhaustive()
    }
}

impl ListingBoard {
    /// Create a board. `registry` answers whether a publisher is a business.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<dyn Registry>,
        verifier: Arc<dyn SignatureVerifier>,
        matchers: Arc<MatcherRegistry>,
        default_matcher: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            verifier,
            matchers,
            default_matcher: default_matcher.into(),
        }
    }

    /// The matching engines this board dispatches to.
    #[must_use]
    pub fn matchers(&self) -> &MatcherRegistry {
        &self.matchers
    }

    /// Publish a listing signed by `owner`.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the signature over the draft does not verify
    /// - `Validation` if a field is missing or the owner is not a business
    /// - `UserNotFound` if the owner is not registered
    pub fn publish(
        &self,
        tx: &mut Transaction<'_>,
        owner: &AccountKey,
        draft: ListingDraft,
        signature: &[u8],
    ) -> Result<Listing> {
        if !self.verifier.verify(owner, &draft.signing_bytes()?, signature) {
            warn!(owner = %owner, "listing signature rejected");
            return Err(MarketError::authentication(owner));
        }
        draft.validate()?;

        let identity = self
            .registry
            .lookup(owner)?
            .ok_or_else(|| MarketError::UserNotFound(owner.clone()))?;
        let Role::Business { company_name } = identity.role else {
            return Err(MarketError::validation("only business accounts may publish listings"));
        };

        let listing = Listing {
            id: ListingId::new(owner.clone(), tx.id().as_str()),
            owner: owner.clone(),
            company_name,
            title: draft.title,
            content: draft.content,
            city: draft.city,
            price: draft.price,
            published_at: tx.timestamp(),
        };
        let bytes = serde_json::to_vec(&listing).map_err(mart_store::StoreError::from)?;
        LISTINGS.put(tx, owner.as_str(), listing.id.tx(), bytes)?;

        debug!(listing = %listing.id, price = %listing.price, "listing staged");
        Ok(listing)
    }

    /// Look up one listing.
    ///
    /// # Errors
    ///
    /// Returns `ListingNotFound` if absent.
    pub fn get(&self, tx: &mut Transaction<'_>, id: &ListingId) -> Result<Listing> {
        self.find(tx, id)?
            .ok_or_else(|| MarketError::ListingNotFound(id.to_string()))
    }

    fn find(&self, tx: &mut Transaction<'_>, id: &ListingId) -> Result<Option<Listing>> {
        Ok(LISTINGS.get_json(tx, id.owner().as_str(), id.tx())?)
    }

    /// Every listing published by `owner`, in key order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn by_owner(&self, tx: &mut Transaction<'_>, owner: &AccountKey) -> Result<Vec<Listing>> {
        LISTINGS
            .scan(tx, owner.as_str())?
            .map(|entry| Ok(entry?.decode_json()?))
            .collect()
    }

    /// Every listing, in key order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn all(&self, tx: &mut Transaction<'_>) -> Result<Vec<Listing>> {
        LISTINGS
            .scan_all(tx)?
            .map(|entry| Ok(entry?.decode_json()?))
            .collect()
    }

    /// Run a matching engine over every listing.
    ///
    /// `matcher` defaults to the configured default matcher.
    ///
    /// # Errors
    ///
    /// - `UnknownMatcher` if no engine has that id
    /// - `Validation` if the query bounds are inverted
    pub fn matching(&self, tx: &mut Transaction<'_>, matcher: Option<&str>, query: &MatchQuery) -> Result<MatchResult> {
        query.validate()?;
        let id = matcher.unwrap_or(&self.default_matcher);
        let engine = self.matchers.get(id)?;

        let candidates: BTreeMap<String, Listing> = self
            .all(tx)?
            .into_iter()
            .map(|listing| (listing.id.to_string(), listing))
            .collect();
        let result = engine.matches(&candidates, query);
        debug!(matcher = id, candidates = candidates.len(), matched = result.len(), "matching done");
        Ok(result)
    }
}

impl ListingService for ListingBoard {
    fn resolve(&self, subject: &ListingId) -> std::result::Result<Option<Quote>, CoreError> {
        let mut tx = Transaction::begin(self.store.as_ref());
        let listing = self
            .find(&mut tx, subject)
            .map_err(|e| CoreError::unavailable("listing", e.to_string()))?;
        Ok(listing.map(|l| Quote {
            owner: l.owner,
            price: l.price,
            title: l.title,
        }))
    }
}
