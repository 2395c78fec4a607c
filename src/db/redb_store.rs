//! Redb-backed persistence for node collections.
//!
//! # Schema
//!
//! ```text
//! COLLECTIONS: collection key -> JSON document
//! ```

use super::{Collection, Store, StoreError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Redb table holding one JSON document per collection.
const COLLECTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

/// Store backed by a single redb file.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        let store = Self::new(Arc::new(db))?;
        info!(path = %path.display(), "Redb store opened");
        Ok(store)
    }

    /// Wrap an existing database handle.
    pub fn new(db: Arc<Database>) -> Result<Self, StoreError> {
        // Ensure the table exists so read transactions never miss it.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(COLLECTIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl Store for RedbStore {
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COLLECTIONS)?;
        let value = table.get(collection.key())?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(COLLECTIONS)?;
            table.insert(collection.key(), bytes)?;
        }
        write_txn.commit()?;

        debug!(%collection, bytes = bytes.len(), "Saved collection");
        Ok(())
    }
}
