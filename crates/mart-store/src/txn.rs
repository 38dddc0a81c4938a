//! Optimistic transactions.
//!
//! A [`Transaction`] buffers writes locally and records every version it
//! observes. Nothing becomes visible to other transactions until
//! [`Transaction::commit`] succeeds; dropping a transaction discards it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;
use std::vec;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::memory::{CommitRequest, LedgerStore, RangeRead, Version, Versioned};

/// Unique identifier of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(String);

impl TxId {
    /// Generate a new random transaction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of atomic work against a [`LedgerStore`].
pub struct Transaction<'a> {
    store: &'a dyn LedgerStore,
    id: TxId,
    timestamp: DateTime<Utc>,
    reads: BTreeMap<String, Option<Versioned>>,
    ranges: Vec<RangeRead>,
    writes: BTreeMap<String, Vec<u8>>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    /// Start a transaction.
    #[must_use]
    pub fn begin(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            id: TxId::new(),
            timestamp: Utc::now(),
            reads: BTreeMap::new(),
            ranges: Vec::new(),
            writes: BTreeMap::new(),
            committed: false,
        }
    }

    /// This transaction's ID.
    #[must_use]
    pub const fn id(&self) -> &TxId {
        &self.id
    }

    /// The time the transaction started; used as "now" by every operation in it.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// True when nothing has been written yet.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Read a key.
    ///
    /// Sees this transaction's own buffered writes. The first committed
    /// version observed for a key is pinned for the rest of the transaction
    /// and validated at commit.
    ///
    /// # Errors
    ///
    /// Propagates backend read failures.
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(seen) = self.reads.get(key) {
            return Ok(seen.as_ref().map(|v| v.value.clone()));
        }
        let seen = self.store.get(key)?;
        let value = seen.as_ref().map(|v| v.value.clone());
        self.reads.insert(key.to_string(), seen);
        Ok(value)
    }

    /// Read a key and decode it as JSON.
    ///
    /// # Errors
    ///
    /// Propagates backend failures and `StoreError::Corrupt` if the stored
    /// bytes do not decode as `T`.
    pub fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        self.get(key)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(key, e)))
            .transpose()
    }

    /// Buffer a write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` for an empty key.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".into()));
        }
        self.writes.insert(key, value);
        Ok(())
    }

    /// Encode `value` as JSON and buffer the write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if `value` cannot be encoded.
    pub fn put_json<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, bytes)
    }

    /// Iterate every key starting with `prefix`, in key order.
    ///
    /// The committed range is taken as one snapshot when the scan starts; its
    /// key set is recorded so that an insert or update under `prefix` by a
    /// concurrent commit invalidates this transaction. Buffered writes are
    /// merged over it as the iterator advances.
    ///
    /// # Errors
    ///
    /// Propagates backend read failures.
    pub fn scan_prefix(&mut self, prefix: &str) -> Result<ScanIter> {
        let committed = self.store.scan(prefix)?;
        self.ranges.push(RangeRead {
            prefix: prefix.to_string(),
            observed: committed.iter().map(|(k, v)| (k.clone(), v.version)).collect(),
        });

        let buffered: Vec<_> = self
            .writes
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(ScanIter {
            committed: committed.into_iter().peekable(),
            buffered: buffered.into_iter().peekable(),
        })
    }

    /// Validate and apply this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if anything this transaction read was
    /// changed by a concurrent commit, or the backend's failure otherwise.
    pub fn commit(mut self) -> Result<Version> {
        let request = CommitRequest {
            tx_id: self.id.to_string(),
            reads: std::mem::take(&mut self.reads)
                .into_iter()
                .map(|(k, v)| (k, v.map(|v| v.version)))
                .collect(),
            ranges: std::mem::take(&mut self.ranges),
            writes: std::mem::take(&mut self.writes),
        };
        self.committed = true;
        self.store.commit(request)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.writes.is_empty() {
            debug!(tx_id = %self.id, writes = self.writes.len(), "transaction discarded");
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("reads", &self.reads.len())
            .field("ranges", &self.ranges.len())
            .field("writes", &self.writes.len())
            .finish()
    }
}

/// Ordered `(key, value)` pairs produced by [`Transaction::scan_prefix`].
///
/// Consumed once; restarting requires a new scan. A buffered write shadows
/// the committed value of the same key.
#[derive(Debug)]
pub struct ScanIter {
    committed: Peekable<vec::IntoIter<(String, Versioned)>>,
    buffered: Peekable<vec::IntoIter<(String, Vec<u8>)>>,
}

impl Iterator for ScanIter {
    type Item = (String, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.committed.peek(), self.buffered.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((c, _)), Some((b, _))) => c.cmp(b),
        };
        match order {
            Ordering::Less => self.committed.next().map(|(k, v)| (k, v.value)),
            Ordering::Greater => self.buffered.next(),
            Ordering::Equal => {
                self.committed.next();
                self.buffered.next()
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (committed, _) = self.committed.size_hint();
        let (buffered, _) = self.buffered.size_hint();
        (committed.max(buffered), committed.checked_add(buffered))
    }
}

/// Run `f` in a fresh transaction, committing only if it returns `Ok`.
///
/// There is no retry: a conflict surfaces as the caller's error type.
///
/// # Errors
///
/// Returns `f`'s error, or the commit failure converted into `E`.
pub fn execute<T, E, F>(store: &dyn LedgerStore, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut Transaction<'_>) -> std::result::Result<T, E>,
    E: From<StoreError>,
{
    let mut tx = Transaction::begin(store);
    let output = f(&mut tx)?;
    tx.commit()?;
    Ok(output)
}
