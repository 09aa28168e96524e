//! Read-through side of the cache.

use crate::backend::SubscriptionPersistor;
use crate::error::Result;
use crate::subscriptions::SubscriptionMetadata;
use std::collections::HashMap;
use std::sync::Arc;

/// Loads subscriptions from the backing store.
///
/// Everything is loaded in one pass at startup; there are no per-key lookups.
pub struct SubscriptionCacheLoader {
    persistor: Arc<dyn SubscriptionPersistor>,
}

impl SubscriptionCacheLoader {
    pub fn new(persistor: Arc<dyn SubscriptionPersistor>) -> Self {
        Self { persistor }
    }

    pub fn load_all(&self) -> Result<HashMap<String, SubscriptionMetadata>> {
        self.persistor.get_subscriptions()
    }
}
