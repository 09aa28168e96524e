//! In-memory subscription cache with read-through and write-through to the
//! backing store.
//!
//! Every `put` and `remove` reaches the backing store before the local map
//! changes, so a failed upstream call leaves the cache untouched. The
//! `*_locally` variants skip the backing store and exist for reconciliation,
//! where the backing store is already the source of truth.

mod loader;
mod writer;

pub use loader::SubscriptionCacheLoader;
pub use writer::SubscriptionCacheWriter;

use crate::backend::SubscriptionPersistor;
use crate::error::{Result, StoreError};
use crate::subscriptions::{CachedSubscription, SubscriptionMetadata};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A `put` the backing store refused. The entry is handed back unchanged.
#[derive(Debug)]
pub struct Rejected {
    pub entry: CachedSubscription,
    pub error: StoreError,
}

/// Subscription cache keyed by subscription id.
pub struct SubscriptionCache {
    entries: HashMap<String, CachedSubscription>,
    loader: SubscriptionCacheLoader,
    writer: SubscriptionCacheWriter,
}

impl SubscriptionCache {
    pub fn new(persistor: Arc<dyn SubscriptionPersistor>) -> Self {
        Self {
            entries: HashMap::new(),
            loader: SubscriptionCacheLoader::new(Arc::clone(&persistor)),
            writer: SubscriptionCacheWriter::new(persistor),
        }
    }

    /// Load every stored subscription that is not already cached.
    ///
    /// New entries start unregistered. Returns how many were added.
    pub fn load_all(&mut self) -> Result<usize> {
        let loaded = self
            .loader
            .load_all()
            .map_err(|e| StoreError::backend("Cache update threw an exception", e))?;

        let mut added = 0;
        for (id, metadata) in loaded {
            if !self.entries.contains_key(&id) {
                self.entries.insert(id, CachedSubscription::new(metadata));
                added += 1;
            }
        }

        debug!(added, total = self.entries.len(), "Cache load complete");
        Ok(added)
    }

    /// Current contents of the backing store.
    pub fn backend_snapshot(&self) -> Result<HashMap<String, SubscriptionMetadata>> {
        self.loader.load_all()
    }

    pub fn get(&self, id: &str) -> Option<&CachedSubscription> {
        self.entries.get(id)
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Write the entry upstream, then cache it.
    pub fn put(&mut self, entry: CachedSubscription) -> std::result::Result<(), Rejected> {
        if let Err(error) = self.writer.write(entry.metadata()) {
            return Err(Rejected { entry, error });
        }
        self.entries.insert(entry.id().to_string(), entry);
        Ok(())
    }

    /// Delete upstream, then drop the cached entry and return it.
    pub fn remove(&mut self, id: &str) -> Result<Option<CachedSubscription>> {
        self.writer.delete(id)?;
        Ok(self.entries.remove(id))
    }

    /// Write every cached entry upstream.
    pub fn flush(&self) -> Result<()> {
        self.writer
            .write_all(self.entries.values().map(|e| e.metadata()))
    }

    pub fn insert_locally(&mut self, entry: CachedSubscription) {
        self.entries.insert(entry.id().to_string(), entry);
    }

    pub fn remove_locally(&mut self, id: &str) -> Option<CachedSubscription> {
        self.entries.remove(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &CachedSubscription> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut CachedSubscription> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
