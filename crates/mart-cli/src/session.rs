//! Ledger state for one CLI invocation.
//!
//! The store is loaded from the state file on open and written back by
//! [`Session::save`] after a command commits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mart_market::{MarketConfig, Marketplace};
use mart_store::MemoryStore;
use tracing::{debug, info};

use crate::error::CliError;

/// An opened state file and the marketplace over it.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    store: Arc<MemoryStore>,
    market: Marketplace,
}

impl Session {
    /// Load `state` (empty if missing) and the optional TOML `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be read or parsed.
    pub fn open(state: &Path, config: Option<&Path>) -> Result<Self, CliError> {
        let config = match config {
            Some(path) => MarketConfig::from_file(path)?,
            None => MarketConfig::default(),
        };
        let store = Arc::new(MemoryStore::load(state)?);
        debug!(path = %state.display(), version = %store.last_version(), "state loaded");

        let market = Marketplace::new(store.clone(), config)?;
        Ok(Self {
            path: state.to_path_buf(),
            store,
            market,
        })
    }

    /// The marketplace.
    #[must_use]
    pub const fn market(&self) -> &Marketplace {
        &self.market
    }

    /// Write the store back to the state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), CliError> {
        self.store.save(&self.path)?;
        info!(path = %self.path.display(), version = %self.store.last_version(), "state saved");
        Ok(())
    }
}
