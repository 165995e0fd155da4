//! Persistence boundary for the key-value namespace.
//!
//! # Responsibility
//! - Define the storage contract the rest of core is written against.
//! - Provide the in-memory backend used by tests and embedders.
//!
//! # Invariants
//! - Backends store opaque serialized strings; they never interpret values.
//! - `keys()` returns keys in sorted order for deterministic iteration.
//! - Core code must not touch application data before migrations succeed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod migrations;
mod sqlite;

pub use sqlite::{open_backend, open_backend_in_memory, SqliteBackend};

pub type StorageResult<T> = Result<T, StorageError>;

/// Transport-level storage error.
#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "storage schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Contract every namespace backend implements.
///
/// The store injects a backend at construction time, so core logic runs
/// unchanged over durable SQLite storage or a plain in-memory map.
pub trait StorageBackend {
    /// Returns the serialized value stored under `key`, if any.
    fn read(&self, key: &str) -> StorageResult<Option<String>>;
    /// Writes (inserts or replaces) the serialized value under `key`.
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
    /// Returns every key in the namespace, sorted ascending.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Map-backed backend with no durability.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryBackend, StorageBackend};

    #[test]
    fn memory_backend_roundtrip_and_sorted_keys() {
        let backend = MemoryBackend::new();
        backend.write("zeta", "1").unwrap();
        backend.write("alpha", "2").unwrap();

        assert_eq!(backend.read("alpha").unwrap().as_deref(), Some("2"));
        assert_eq!(backend.read("missing").unwrap(), None);
        assert_eq!(backend.keys().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn memory_backend_remove_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.write("k", "v").unwrap();
        backend.remove("k").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
    }
}
