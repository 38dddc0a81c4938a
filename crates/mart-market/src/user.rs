//! User registry.
//!
//! Stores signed user profiles and answers the [`Registry`] contract the
//! account ledger and listing board consume.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mart_core::{AccountKey, CoreError, Identity, Registry, Role, SignatureVerifier};
use mart_store::{CompositeKey, LedgerStore, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MarketError, Result};

const USERS: &str = "user";

/// Profile a user signs and submits on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub nickname: String,
    /// Legal name.
    pub name: String,
    /// Age.
    pub age: String,
    /// Phone number.
    pub phone: String,
    /// Identity document number.
    pub id_number: String,
    /// Company registration id, for business accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// Company name, for business accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl UserProfile {
    /// The bytes the user signs: the profile's JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be encoded.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| MarketError::validation(format!("unencodable profile: {e}")))
    }

    /// Checks required fields and company consistency.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("age", &self.age),
            ("phone", &self.phone),
            ("id_number", &self.id_number),
            ("nickname", &self.nickname),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(MarketError::validation(format!("profile {field} is required")));
            }
        }
        match (present(self.company_id.as_deref()), present(self.company_name.as_deref())) {
            (true, true) | (false, false) => Ok(()),
            _ => Err(MarketError::validation(
                "company_id and company_name must both be set or both be empty",
            )),
        }
    }

    /// Business when a company is given, consumer otherwise.
    #[must_use]
    pub fn role(&self) -> Role {
        match self.company_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => Role::Business {
                company_name: name.to_string(),
            },
            None => Role::Consumer,
        }
    }
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// A stored registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The account.
    pub account: AccountKey,
    /// Latest profile.
    pub profile: UserProfile,
    /// Role derived from the profile.
    pub role: Role,
    /// First registration time.
    pub registered_at: DateTime<Utc>,
    /// Latest profile update.
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The registry answer for this user.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            account: self.account.clone(),
            role: self.role.clone(),
        }
    }
}

/// Outcome of [`UserRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The stored record.
    pub record: UserRecord,
    /// True on the account's first registration.
    pub first: bool,
}

/// Signed user registrations.
pub struct UserRegistry {
    store: Arc<dyn LedgerStore>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl fmt::Debug for UserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegistry").finish_non_exhaustive()
    }
}

impl UserRegistry {
    /// Create a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Register or update `account`'s profile.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the signature over the profile does not verify
    /// - `Validation` if the profile is incomplete
    pub fn register(
        &self,
        tx: &mut Transaction<'_>,
        account: &AccountKey,
        profile: UserProfile,
        signature: &[u8],
    ) -> Result<Registration> {
        if !self.verifier.verify(account, &profile.signing_bytes()?, signature) {
            warn!(account = %account, "profile signature rejected");
            return Err(MarketError::authentication(account));
        }
        profile.validate()?;

        let key = user_key(account)?;
        let existing: Option<UserRecord> = tx.get_json(&key)?;
        let now = tx.timestamp();
        let record = UserRecord {
            account: account.clone(),
            role: profile.role(),
            profile,
            registered_at: existing.as_ref().map_or(now, |r| r.registered_at),
            updated_at: now,
        };
        tx.put_json(key, &record)?;

        debug!(account = %account, business = record.role.is_business(), "registration staged");
        Ok(Registration {
            record,
            first: existing.is_none(),
        })
    }

    /// Read a registration inside `tx`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn get(&self, tx: &mut Transaction<'_>, account: &AccountKey) -> Result<Option<UserRecord>> {
        Ok(tx.get_json(&user_key(account)?)?)
    }
}

impl Registry for UserRegistry {
    fn lookup(&self, account: &AccountKey) -> std::result::Result<Option<Identity>, CoreError> {
        let mut tx = Transaction::begin(self.store.as_ref());
        let record = self
            .get(&mut tx, account)
            .map_err(|e| CoreError::unavailable("registry", e.to_string()))?;
        Ok(record.map(|r| r.identity()))
    }
}

fn user_key(account: &AccountKey) -> Result<String> {
    Ok(CompositeKey::new(USERS, &[account.as_str()])?.encode())
}
