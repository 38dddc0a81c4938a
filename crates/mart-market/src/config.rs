//! Marketplace configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! finish_policy = "sequential"
//! allow_cancel = true
//! onboarding_grant = 100
//! ```

use std::path::Path;

use mart_core::Amount;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::matching::CITY_PRICE;

/// Which state `finish` requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPolicy {
    /// `confirm` and `finish` are alternative next steps from `Submitted`.
    #[default]
    Branching,
    /// `finish` requires a prior `confirm`.
    Sequential,
}

/// Marketplace service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Precondition for `finish`.
    pub finish_policy: FinishPolicy,
    /// Enables the `cancel` operation.
    pub allow_cancel: bool,
    /// Only the consumer or counterparty may confirm, finish or cancel.
    pub require_party_signer: bool,
    /// Tokens minted on a user's first registration.
    pub onboarding_grant: Amount,
    /// Matcher used when a request names none.
    pub default_matcher: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            finish_policy: FinishPolicy::Branching,
            allow_cancel: false,
            require_party_signer: false,
            onboarding_grant: Amount::new(100),
            default_matcher: CITY_PRICE.to_string(),
        }
    }
}

impl MarketConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MarketError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MarketError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the default matcher id is empty.
    pub fn validate(&self) -> Result<()> {
        if self.default_matcher.trim().is_empty() {
            return Err(MarketError::Config("default_matcher cannot be empty".into()));
        }
        Ok(())
    }
}
