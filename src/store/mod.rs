//! Key/value document storage.
//!
//! Every component persists its state as JSON documents under a handful of
//! string keys. The medium underneath only has to offer [`DocumentStore`]'s
//! get/set/delete; there is no atomicity across keys, so components that
//! touch more than one key do it inside the single lock held by
//! [`Documents`].

pub mod keys;
mod memory;
mod schema;
mod sqlite;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by a storage backend or while (de)serializing documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Poisoned lock: {0}")]
    LockPoisoned(&'static str),

    /// A multi-key update failed halfway and could not be rolled back.
    #[error("Stored data is inconsistent: {0}")]
    Corrupted(String),
}

/// The storage medium: string keys to string values.
pub trait DocumentStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing whatever was there.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// Shared handle over a document store.
///
/// All components built on the same handle are serialized by one mutex;
/// hold a [`DocumentsGuard`] for the whole read-modify-write of an operation.
#[derive(Clone)]
pub struct Documents {
    store: Arc<Mutex<Box<dyn DocumentStore>>>,
}

impl Documents {
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Enter the critical section.
    pub fn lock(&self) -> Result<DocumentsGuard<'_>, StoreError> {
        let store = self
            .store
            .lock()
            .map_err(|_| StoreError::LockPoisoned("documents"))?;
        Ok(DocumentsGuard { store })
    }
}

impl std::fmt::Debug for Documents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Documents").finish_non_exhaustive()
    }
}

/// Exclusive access to the store with typed JSON helpers.
pub struct DocumentsGuard<'a> {
    store: MutexGuard<'a, Box<dyn DocumentStore>>,
}

impl DocumentsGuard<'_> {
    /// Read and decode a document, `None` if the key is absent.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read a collection document, treating an absent key as empty.
    pub fn read_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, StoreError> {
        Ok(self.read(key)?.unwrap_or_default())
    }

    /// Encode and write a document, retrying once on a backend failure.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }

    /// Raw read, used where a caller needs the exact stored bytes.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.get(key)
    }

    /// Raw write with the same single retry as [`write`](Self::write).
    pub fn set_raw(&self, key: &str, raw: &str) -> Result<(), StoreError> {
        match self.store.set(key, raw) {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!("Write to {} failed ({}), retrying once", key, first);
                self.store.set(key, raw)
            }
        }
    }

    /// Delete a key, retrying once.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.store.delete(key) {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!("Delete of {} failed ({}), retrying once", key, first);
                self.store.delete(key)
            }
        }
    }

    /// Put a key back to a previously read raw value, deleting it if it was absent.
    pub fn restore_raw(&self, key: &str, previous: Option<&str>) -> Result<(), StoreError> {
        match previous {
            Some(raw) => self.set_raw(key, raw),
            None => self.remove(key),
        }
    }
}
