//! In-memory store for nodes configured without a database, and for tests.

use super::{Collection, Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Store that keeps collections in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections saved so far.
    pub fn len(&self) -> usize {
        self.collections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.lock().is_empty()
    }
}

impl Store for MemoryStore {
    fn load_raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.collections.lock().get(&collection).cloned())
    }

    fn save_raw(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        self.collections.lock().insert(collection, bytes.to_vec());
        Ok(())
    }
}
