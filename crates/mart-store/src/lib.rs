//! # mart-store
//!
//! The ledger store every marketplace partition writes through.
//!
//! - [`LedgerStore`] - the versioned key-value backend contract
//! - [`MemoryStore`] - in-process backend with JSON snapshot persistence
//! - [`Transaction`] - buffered writes, read-set and range validation at commit
//! - [`CompositeKey`] / [`SecondaryIndex`] - owner-scoped range-scannable views
//!
//! ## Example
//!
//! ```rust
//! use mart_store::{MemoryStore, SecondaryIndex, Transaction};
//!
//! const BY_OWNER: SecondaryIndex = SecondaryIndex::new("by_owner");
//!
//! let store = MemoryStore::new();
//! let mut tx = Transaction::begin(&store);
//! BY_OWNER.put(&mut tx, "alice", "t1", b"{}".to_vec()).unwrap();
//! tx.commit().unwrap();
//!
//! let mut tx = Transaction::begin(&store);
//! assert_eq!(BY_OWNER.scan(&mut tx, "alice").unwrap().count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod index;
pub mod key;
pub mod memory;
mod snapshot;
pub mod txn;

pub use error::{Result, StoreError};
pub use index::{IndexEntry, IndexScan, SecondaryIndex};
pub use key::CompositeKey;
pub use memory::{CommitRequest, LedgerStore, MemoryStore, RangeRead, Version, Versioned};
pub use txn::{ScanIter, Transaction, TxId, execute};
