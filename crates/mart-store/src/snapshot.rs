//! JSON snapshot persistence for [`MemoryStore`].
//!
//! A store remembers the snapshot version it was loaded from. Saving is a
//! compare-and-swap on that version: if another process saved the file in
//! the meantime, the save is refused with `StoreError::Conflict` and the file
//! is left untouched, so the caller can reload and retry.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::memory::{MemoryStore, State};

/// The part of a snapshot needed to check who wrote it last.
#[derive(Deserialize)]
struct Header {
    last_version: u64,
}

impl MemoryStore {
    /// Load a store from a snapshot file, or start empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or
    /// `StoreError::Corrupt` if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let Some(content) = read_snapshot(path)? else {
            info!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::new());
        };
        let state: State =
            serde_json::from_str(&content).map_err(|e| StoreError::corrupt(path.display().to_string(), e))?;
        info!(
            path = %path.display(),
            keys = state.entries.len(),
            version = state.last_version,
            "snapshot loaded"
        );
        Ok(Self {
            persisted: Mutex::new(state.last_version),
            state: RwLock::new(state),
        })
    }

    /// Write every key and version to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the file was saved by someone else
    /// since this store loaded or last saved it, or an I/O or encoding error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (content, version) = {
            let state = self.state.read();
            (serde_json::to_string_pretty(&*state)?, state.last_version)
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut persisted = self.persisted.lock();
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, content)?;

        let on_disk = match read_snapshot(path) {
            Ok(Some(existing)) => serde_json::from_str::<Header>(&existing)
                .map(|h| h.last_version)
                .map_err(|e| StoreError::corrupt(path.display().to_string(), e)),
            Ok(None) => Ok(0),
            Err(e) => Err(e),
        };
        let outcome = on_disk.and_then(|on_disk| {
            if on_disk == *persisted {
                Ok(())
            } else {
                warn!(path = %path.display(), expected = *persisted, found = on_disk, "snapshot changed since load");
                Err(StoreError::conflict(path.display().to_string()))
            }
        });
        if let Err(err) = outcome.and_then(|()| fs::rename(&tmp, path).map_err(StoreError::from)) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        *persisted = version;
        info!(path = %path.display(), version, "snapshot saved");
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::{LedgerStore, MemoryStore, StoreError, Transaction};

    fn put(store: &MemoryStore, key: &str, value: &[u8]) {
        let mut tx = Transaction::begin(store);
        tx.put(key, value.to_vec()).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn save_then_load_preserves_keys_and_versions() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        tx.put("alice_coin", b"100".to_vec()).unwrap();
        tx.put("\u{0}trade_c\u{0}alice\u{0}t1\u{0}", b"{}".to_vec()).unwrap();
        let version = tx.commit().unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.last_version(), version);
        let entry = loaded.get("alice_coin").unwrap().unwrap();
        assert_eq!(entry.value, b"100".to_vec());
        assert_eq!(entry.version, version);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = MemoryStore::load(dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(MemoryStore::load(&path), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn repeated_saves_from_one_store_succeed() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        let store = MemoryStore::load(&path).unwrap();
        put(&store, "a", b"1");
        store.save(&path).unwrap();
        put(&store, "b", b"2");
        store.save(&path).unwrap();

        assert_eq!(MemoryStore::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn stale_save_is_refused_and_keeps_the_winner() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        let first = MemoryStore::load(&path).unwrap();
        let second = MemoryStore::load(&path).unwrap();

        put(&first, "alice_coin", b"10");
        first.save(&path).unwrap();

        put(&second, "bob_coin", b"20");
        let err = second.save(&path).unwrap_err();
        assert!(err.is_retryable(), "expected conflict, got {err}");

        let reloaded = MemoryStore::load(&path).unwrap();
        assert_eq!(reloaded.get("alice_coin").unwrap().unwrap().value, b"10".to_vec());
        assert!(reloaded.get("bob_coin").unwrap().is_none());

        // No temporary files are left behind.
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn reload_after_conflict_can_save() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        let first = MemoryStore::load(&path).unwrap();
        let second = MemoryStore::load(&path).unwrap();
        put(&first, "a", b"1");
        first.save(&path).unwrap();
        put(&second, "b", b"2");
        assert!(second.save(&path).is_err());

        let retry = MemoryStore::load(&path).unwrap();
        put(&retry, "b", b"2");
        retry.save(&path).unwrap();
        assert_eq!(MemoryStore::load(&path).unwrap().len(), 2);
    }
}
