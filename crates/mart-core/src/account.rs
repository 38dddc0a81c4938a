//! Account keys.
//!
//! An account is identified by its Ed25519 public key, carried around as a
//! base58 string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A base58-encoded Ed25519 public key naming an account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountKey(String);

impl AccountKey {
    /// Parse an account key from its base58 form.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid base58 or wrong length.
    pub fn from_base58(s: &str) -> Result<Self, CoreError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::InvalidKey(format!("invalid base58: {e}")))?;
        if bytes.len() != 32 {
            return Err(CoreError::InvalidKey(format!(
                "key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Build an account key from raw public key bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    /// The base58 string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to the 32 raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the stored string no longer decodes to 32 bytes.
    pub fn to_bytes(&self) -> Result<[u8; 32], CoreError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CoreError::InvalidKey(format!("invalid base58: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKey("key must be 32 bytes".into()))
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl TryFrom<String> for AccountKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base58(&value)
    }
}

impl From<AccountKey> for String {
    fn from(key: AccountKey) -> Self {
        key.0
    }
}
