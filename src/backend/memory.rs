//! In-memory persistor.

use super::SubscriptionPersistor;
use crate::error::Result;
use crate::subscriptions::SubscriptionMetadata;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps subscriptions in a map. Counts upstream calls for inspection.
#[derive(Default)]
pub struct MemoryPersistor {
    entries: RwLock<HashMap<String, SubscriptionMetadata>>,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryPersistor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given subscriptions already stored.
    pub fn with_entries(entries: impl IntoIterator<Item = SubscriptionMetadata>) -> Self {
        let map = entries
            .into_iter()
            .map(|m| (m.id().to_string(), m))
            .collect();
        Self {
            entries: RwLock::new(map),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<SubscriptionMetadata> {
        self.entries.read().get(id).cloned()
    }

    /// Number of `insert` calls received.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls received.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl SubscriptionPersistor for MemoryPersistor {
    fn insert(&self, metadata: &SubscriptionMetadata) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .insert(metadata.id().to_string(), metadata.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.entries.write().remove(id);
        Ok(())
    }

    fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionMetadata>> {
        Ok(self.entries.read().clone())
    }
}
