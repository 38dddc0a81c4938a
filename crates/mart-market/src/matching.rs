//! Listing matching engines.
//!
//! An engine receives every listing keyed by id plus a [`MatchQuery`] and
//! returns the selected listings in rank order. Engines are registered by
//! name in a [`MatcherRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use mart_core::Amount;
use parking_lot::RwLock;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MarketError, Result};
use crate::listing::Listing;

/// Id of the built-in city and price-range matcher.
pub const CITY_PRICE: &str = "city-price";

/// A city filter and an inclusive price range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    /// City, compared case-insensitively.
    pub city: String,
    /// Lowest acceptable price.
    pub lower: Amount,
    /// Highest acceptable price.
    pub upper: Amount,
}

impl MatchQuery {
    /// Build a query.
    pub fn new(city: impl Into<String>, lower: Amount, upper: Amount) -> Self {
        Self {
            city: city.into(),
            lower,
            upper,
        }
    }

    /// Rejects inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` if `lower > upper`.
    pub fn validate(&self) -> Result<()> {
        if self.lower > self.upper {
            return Err(MarketError::validation(format!(
                "price lower bound {} exceeds upper bound {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Listings in rank order.
///
/// Serializes as a JSON object keyed by rank: `{"0": ..., "1": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    ranked: Vec<Listing>,
}

impl MatchResult {
    /// Wrap listings already in rank order.
    #[must_use]
    pub fn new(ranked: Vec<Listing>) -> Self {
        Self { ranked }
    }

    /// The ranked listings.
    #[must_use]
    pub fn listings(&self) -> &[Listing] {
        &self.ranked
    }

    /// `(rank, listing)` pairs, rank rendered as `"0"`, `"1"`, ...
    pub fn keyed(&self) -> impl Iterator<Item = (String, &Listing)> {
        self.ranked.iter().enumerate().map(|(rank, l)| (rank.to_string(), l))
    }

    /// Number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// True when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Take the ranked listings.
    #[must_use]
    pub fn into_listings(self) -> Vec<Listing> {
        self.ranked
    }
}

impl Serialize for MatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ranked.len()))?;
        for (rank, listing) in self.keyed() {
            map.serialize_entry(&rank, listing)?;
        }
        map.end()
    }
}

/// A matching engine.
pub trait Matcher: Send + Sync {
    /// Select and rank `listings` for `query`. `query` has been validated.
    fn matches(&self, listings: &BTreeMap<String, Listing>, query: &MatchQuery) -> MatchResult;
}

/// Same city (case-insensitive), price within `[lower, upper]`, newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CityPriceMatcher;

impl Matcher for CityPriceMatcher {
    fn matches(&self, listings: &BTreeMap<String, Listing>, query: &MatchQuery) -> MatchResult {
        let city = query.city.to_lowercase();
        let mut ranked: Vec<Listing> = listings
            .values()
            .filter(|l| l.city.to_lowercase() == city)
            .filter(|l| (query.lower..=query.upper).contains(&l.price))
            .cloned()
            .collect();
        // Stable, so equal publish times keep id order.
        ranked.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        MatchResult::new(ranked)
    }
}

/// Named matching engines.
pub struct MatcherRegistry {
    engines: RwLock<HashMap<String, Arc<dyn Matcher>>>,
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry").field("ids", &self.ids()).finish()
    }
}

impl Default for MatcherRegistry {
    /// A registry holding the built-in [`CityPriceMatcher`].
    fn default() -> Self {
        let registry = Self::empty();
        registry
            .engines
            .write()
            .insert(CITY_PRICE.to_string(), Arc::new(CityPriceMatcher));
        registry
    }
}

impl MatcherRegistry {
    /// A registry with no engines.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Register `matcher` under `id`, replacing any previous engine.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` for a blank id.
    pub fn register(&self, id: impl Into<String>, matcher: Arc<dyn Matcher>) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MarketError::validation("matcher id cannot be empty"));
        }
        if self.engines.write().insert(id.clone(), matcher).is_some() {
            warn!(matcher = %id, "matcher replaced");
        } else {
            info!(matcher = %id, "matcher registered");
        }
        Ok(())
    }

    /// Look up an engine.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::UnknownMatcher` if none is registered under `id`.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Matcher>> {
        self.engines
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MarketError::UnknownMatcher(id.to_string()))
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.engines.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
