//! # mart-market
//!
//! Marketplace settlement on top of the account ledger.
//!
//! This crate provides:
//!
//! - [`TradeLedger`] - the Submitted → Confirmed/Finished/Cancelled state
//!   machine and the escrow moves each step implies
//! - [`TradeBook`] - consumer and counterparty views of every trade
//! - [`UserRegistry`] - signed profiles, implementing [`mart_core::Registry`]
//! - [`ListingBoard`] - business listings, implementing [`ListingService`]
//! - [`MatcherRegistry`] - named matching engines, with [`CityPriceMatcher`]
//! - [`Marketplace`] - one-transaction-per-call service over all of the above
//! - [`MarketConfig`] - TOML configuration, including the [`FinishPolicy`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod book;
pub mod config;
pub mod error;
pub mod listing;
pub mod market;
pub mod matching;
pub mod trade;
pub mod trades;
pub mod user;

pub use book::{TRADES_BY_CONSUMER, TRADES_BY_COUNTERPARTY, TradeBook};
pub use config::{FinishPolicy, MarketConfig};
pub use error::{MarketError, Result};
pub use listing::{LISTINGS, Listing, ListingBoard, ListingDraft, ListingId, ListingService, Quote};
pub use market::{Marketplace, Onboarding};
pub use matching::{CITY_PRICE, CityPriceMatcher, MatchQuery, MatchResult, Matcher, MatcherRegistry};
pub use trade::{Trade, TradeId, TradeState};
pub use trades::TradeLedger;
pub use user::{Registration, UserProfile, UserRecord, UserRegistry};
