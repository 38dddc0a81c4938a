//! Per-party trade views.
//!
//! Every trade is stored twice: under `("trade_c", consumer, tx)` and under
//! `("trade_b", counterparty, tx)`. [`TradeBook::write`] is the only write
//! path and always writes both copies with identical bytes.

use mart_core::AccountKey;
use mart_store::{SecondaryIndex, StoreError, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::trade::{Trade, TradeId};

/// Trades by consumer.
pub const TRADES_BY_CONSUMER: SecondaryIndex = SecondaryIndex::new("trade_c");

/// Trades by counterparty.
pub const TRADES_BY_COUNTERPARTY: SecondaryIndex = SecondaryIndex::new("trade_b");

/// Reads and writes both trade views.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeBook;

impl TradeBook {
    /// Write `trade` to both views.
    ///
    /// # Errors
    ///
    /// Propagates encoding and key errors.
    pub fn write(&self, tx: &mut Transaction<'_>, trade: &Trade) -> Result<()> {
        let bytes = serde_json::to_vec(trade).map_err(StoreError::from)?;
        let tail = trade.id.tx();
        TRADES_BY_CONSUMER.put(tx, trade.consumer.as_str(), tail, bytes.clone())?;
        TRADES_BY_COUNTERPARTY.put(tx, trade.counterparty.as_str(), tail, bytes)?;
        debug!(trade = %trade.id, state = %trade.state, "trade views staged");
        Ok(())
    }

    /// Load a trade from the consumer view.
    ///
    /// # Errors
    ///
    /// Propagates store and decoding errors.
    pub fn get(&self, tx: &mut Transaction<'_>, id: &TradeId) -> Result<Option<Trade>> {
        Ok(TRADES_BY_CONSUMER.get_json(tx, id.consumer().as_str(), id.tx())?)
    }

    /// Every trade where `account` is the consumer, in key order.
    ///
    /// # Errors
    ///
    /// Propagates store and decoding errors.
    pub fn by_consumer(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<Vec<Trade>> {
        Self::collect(tx, TRADES_BY_CONSUMER, account)
    }

    /// Every trade where `account` is the counterparty, in key order.
    ///
    /// # Errors
    ///
    /// Propagates store and decoding errors.
    pub fn by_counterparty(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<Vec<Trade>> {
        Self::collect(tx, TRADES_BY_COUNTERPARTY, account)
    }

    fn collect(tx: &mut Transaction<'_>, index: SecondaryIndex, account: &AccountKey) -> Result<Vec<Trade>> {
        index
            .scan(tx, account.as_str())?
            .map(|entry| Ok(entry?.decode_json()?))
            .collect()
    }
}
