//! Backend contract and the in-memory versioned store.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Monotonic commit sequence number stamped on every written key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Create a version from a raw sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// The raw sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A stored value and the commit that last wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    /// Raw value bytes.
    pub value: Vec<u8>,
    /// Commit that last wrote the key.
    pub version: Version,
}

/// A prefix scan observed by a transaction, recorded for phantom detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRead {
    /// The scanned prefix.
    pub prefix: String,
    /// Keys and versions present at scan time, in key order.
    pub observed: Vec<(String, Version)>,
}

/// Everything a backend needs to validate and apply a transaction.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// Transaction identifier, for logging.
    pub tx_id: String,
    /// Point reads: key and the version observed (`None` = absent).
    pub reads: Vec<(String, Option<Version>)>,
    /// Range reads.
    pub ranges: Vec<RangeRead>,
    /// Buffered writes.
    pub writes: BTreeMap<String, Vec<u8>>,
}

/// The versioned key-value backend transactions run against.
///
/// Implementations must validate and apply a [`CommitRequest`] atomically:
/// either every write becomes visible with one new version or none does.
pub trait LedgerStore: Send + Sync {
    /// Read the latest committed value of `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// All committed entries whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the backend cannot be read.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Versioned)>>;

    /// Validate the read set and apply the writes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if any observed key or range changed,
    /// or `StoreError::Unavailable` if the writes could not be applied.
    fn commit(&self, request: CommitRequest) -> Result<Version>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct State {
    pub(crate) last_version: u64,
    pub(crate) entries: BTreeMap<String, Versioned>,
}

impl State {
    fn range<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a Versioned)> {
        self.entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    fn validate(&self, request: &CommitRequest) -> Result<()> {
        for (key, seen) in &request.reads {
            let current = self.entries.get(key).map(|v| v.version);
            if current != *seen {
                return Err(StoreError::conflict(key.clone()));
            }
        }
        for range in &request.ranges {
            let mut current = self.range(&range.prefix);
            let mut observed = range.observed.iter();
            loop {
                match (current.next(), observed.next()) {
                    (None, None) => break,
                    (Some((k, v)), Some((ok, ov))) if k == ok && v.version == *ov => {}
                    (Some((k, _)), _) => return Err(StoreError::conflict(k.clone())),
                    (None, Some((ok, _))) => return Err(StoreError::conflict(ok.clone())),
                }
            }
        }
        Ok(())
    }
}

/// In-memory [`LedgerStore`] guarded by a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub(crate) state: RwLock<State>,
    /// Version of the snapshot this store was loaded from or last saved as.
    pub(crate) persisted: Mutex<u64>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The version of the most recent commit.
    #[must_use]
    pub fn last_version(&self) -> Version {
        Version(self.state.read().last_version)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// True when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.state.read().entries.get(key).cloned())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Versioned)>> {
        Ok(self
            .state
            .read()
            .range(prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn commit(&self, request: CommitRequest) -> Result<Version> {
        let mut state = self.state.write();

        if let Err(err) = state.validate(&request) {
            warn!(tx_id = %request.tx_id, error = %err, "commit rejected");
            return Err(err);
        }

        if request.writes.is_empty() {
            return Ok(Version(state.last_version));
        }

        let next = state
            .last_version
            .checked_add(1)
            .ok_or_else(|| StoreError::Unavailable("version space exhausted".into()))?;
        let version = Version(next);
        let count = request.writes.len();
        for (key, value) in request.writes {
            state.entries.insert(key, Versioned { value, version });
        }
        state.last_version = next;

        debug!(tx_id = %request.tx_id, version = %version, writes = count, "commit applied");
        Ok(version)
    }
}
