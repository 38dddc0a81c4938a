//! Owner-scoped secondary index over composite keys.
//!
//! Entries live at `(prefix, owner, tail)`. Scans return entries in
//! underlying key order, which is owner then tail, never a business field.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::key::CompositeKey;
use crate::txn::{ScanIter, Transaction};

/// A named collection of owner-scoped entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryIndex {
    prefix: &'static str,
}

/// One decoded index row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Encoded store key.
    pub key: String,
    /// Owner component.
    pub owner: String,
    /// Unique suffix within the owner.
    pub tail: String,
    /// Stored value bytes.
    pub value: Vec<u8>,
}

impl IndexEntry {
    /// Decode the value as JSON.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` naming this entry's key.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.value).map_err(|e| StoreError::corrupt(&*self.key, e))
    }
}

impl SecondaryIndex {
    /// An index over the collection named `prefix`.
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    /// The collection prefix.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// The encoded store key for `(owner, tail)`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if a component is malformed.
    pub fn key(&self, owner: &str, tail: &str) -> Result<String> {
        Ok(CompositeKey::new(self.prefix, &[owner, tail])?.encode())
    }

    /// Insert or overwrite one entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if a component is malformed.
    pub fn put(&self, tx: &mut Transaction<'_>, owner: &str, tail: &str, value: Vec<u8>) -> Result<()> {
        let key = self.key(owner, tail)?;
        debug!(index = self.prefix, owner, tail, "index put");
        tx.put(key, value)
    }

    /// Point lookup of one entry.
    ///
    /// # Errors
    ///
    /// Propagates key and backend errors.
    pub fn get(&self, tx: &mut Transaction<'_>, owner: &str, tail: &str) -> Result<Option<Vec<u8>>> {
        let key = self.key(owner, tail)?;
        tx.get(&key)
    }

    /// Point lookup of one entry, decoded as JSON.
    ///
    /// # Errors
    ///
    /// Propagates key and backend errors, and `StoreError::Corrupt` if the
    /// stored bytes do not decode as `T`.
    pub fn get_json<T: DeserializeOwned>(&self, tx: &mut Transaction<'_>, owner: &str, tail: &str) -> Result<Option<T>> {
        let key = self.key(owner, tail)?;
        tx.get_json(&key)
    }

    /// Every entry for `owner`.
    ///
    /// # Errors
    ///
    /// Propagates key and backend errors.
    pub fn scan(&self, tx: &mut Transaction<'_>, owner: &str) -> Result<IndexScan> {
        let partial = CompositeKey::new(self.prefix, &[owner])?.encode();
        Ok(IndexScan {
            inner: tx.scan_prefix(&partial)?,
        })
    }

    /// Every entry for every owner.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn scan_all(&self, tx: &mut Transaction<'_>) -> Result<IndexScan> {
        let partial = CompositeKey::new::<&str>(self.prefix, &[])?.encode();
        Ok(IndexScan {
            inner: tx.scan_prefix(&partial)?,
        })
    }
}

/// Decoding iterator over an index range.
#[derive(Debug)]
pub struct IndexScan {
    inner: ScanIter,
}

impl Iterator for IndexScan {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.next()?;
        Some(decode(key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn decode(key: String, value: Vec<u8>) -> Result<IndexEntry> {
    let composite = CompositeKey::decode(&key)?;
    match composite.attrs() {
        [owner, tail] => Ok(IndexEntry {
            owner: owner.clone(),
            tail: tail.clone(),
            key,
            value,
        }),
        other => Err(StoreError::InvalidKey(format!(
            "index key has {} attributes, expected 2",
            other.len()
        ))),
    }
}
