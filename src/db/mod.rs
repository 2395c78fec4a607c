//! Persistent storage for node state.
//!
//! Each node keeps five collections, each saved whole after every mutation:
//! - `users` and `channels`: ordered name lists
//! - `logins`, `messages`, `publications`: append-only logs
//!
//! Backends implement [`Store`] over raw bytes. The typed [`load`] and
//! [`save`] helpers encode values as JSON and absorb failures: a node starts
//! empty when a collection cannot be read, and keeps serving when one cannot
//! be written.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// A persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Channels,
    Logins,
    Messages,
    Publications,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Self::Users,
        Self::Channels,
        Self::Logins,
        Self::Messages,
        Self::Publications,
    ];

    /// Storage key of the collection.
    pub fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Channels => "channels",
            Self::Logins => "logins",
            Self::Messages => "messages",
            Self::Publications => "publications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Whole-collection byte storage.
pub trait Store: Send + Sync {
    /// Read a collection. `Ok(None)` when it was never saved.
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite a collection.
    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Load and decode a collection, falling back to its default on any failure.
pub fn load<T>(store: &dyn Store, collection: Collection) -> T
where
    T: DeserializeOwned + Default,
{
    let bytes = match store.load_raw(collection) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(%collection, "Collection not found, starting empty");
            return T::default();
        }
        Err(e) => {
            warn!(%collection, error = %e, "Failed to read collection, starting empty");
            return T::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(%collection, error = %e, "Failed to decode collection, starting empty");
            T::default()
        }
    }
}

/// Encode and save a collection. Failures are logged and swallowed.
pub fn save<T>(store: &dyn Store, collection: Collection, value: &T)
where
    T: Serialize + ?Sized,
{
    let result = serde_json::to_vec(value)
        .map_err(StoreError::from)
        .and_then(|bytes| store.save_raw(collection, &bytes));

    if let Err(e) = result {
        error!(%collection, error = %e, "Failed to persist collection");
        crate::metrics::record_store_failure(collection.key());
    }
}
