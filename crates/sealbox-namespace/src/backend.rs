//! Key-value storage backends for the namespace store.
//!
//! The store only needs a flat key space with `get`/`put`/`delete`/`list`,
//! each individually atomic and durable once acknowledged. Production uses
//! redb (write txn + commit per mutation); tests use the in-memory backend.

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use sealbox_common::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

/// Single table holding every key the namespace store persists.
const NAMESPACE_STORE: TableDefinition<&str, &[u8]> = TableDefinition::new("namespace_store");

/// Flat key-value storage consumed by the namespace store.
///
/// Implementations must make each call atomic and, for the durable ones,
/// acknowledged writes must survive a crash.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored at `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Durably store `value` at `key`, replacing any previous value
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the value at `key`; removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// List all keys starting with `prefix`, in lexical order
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

fn storage_err(e: impl Display) -> Error {
    Error::StorageUnavailable(e.to_string())
}

/// Persistent backend over a redb database file.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage_err)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _t = write_txn.open_table(NAMESPACE_STORE).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }
}

impl StorageBackend for RedbBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(NAMESPACE_STORE).map_err(storage_err)?;
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .map(|v| v.value().to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(NAMESPACE_STORE).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(NAMESPACE_STORE).map_err(storage_err)?;
            table.remove(key).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(NAMESPACE_STORE).map_err(storage_err)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let entry = entry.map_err(storage_err)?;
            let k = entry.0.value();
            if k.starts_with(prefix) {
                keys.push(k.to_string());
            }
        }
        Ok(keys)
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise_backend(backend: &dyn StorageBackend) {
        assert!(backend.get("a/1").unwrap().is_none());

        backend.put("a/1", b"one").unwrap();
        backend.put("a/2", b"two").unwrap();
        backend.put("b/1", b"three").unwrap();
        assert_eq!(backend.get("a/1").unwrap().unwrap(), b"one");

        assert_eq!(backend.list("a/").unwrap(), vec!["a/1", "a/2"]);
        assert_eq!(backend.list("").unwrap().len(), 3);

        backend.delete("a/1").unwrap();
        assert!(backend.get("a/1").unwrap().is_none());
        // absent key delete is a no-op
        backend.delete("a/1").unwrap();
    }

    #[test]
    fn test_memory_backend() {
        exercise_backend(&MemoryBackend::new());
    }

    #[test]
    fn test_redb_backend() {
        let dir = tempdir().unwrap();
        exercise_backend(&RedbBackend::open(dir.path().join("ns.redb")).unwrap());
    }

    #[test]
    fn test_redb_backend_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ns.redb");
        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.put("k", b"v").unwrap();
        }
        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.get("k").unwrap().unwrap(), b"v");
    }
}
