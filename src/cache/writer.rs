//! Write-through side of the cache.

use crate::backend::SubscriptionPersistor;
use crate::error::{require_non_empty, Result, StoreError};
use crate::subscriptions::SubscriptionMetadata;
use std::sync::Arc;
use tracing::warn;

/// Propagates cache writes and removals to the backing store.
pub struct SubscriptionCacheWriter {
    persistor: Arc<dyn SubscriptionPersistor>,
}

impl SubscriptionCacheWriter {
    pub fn new(persistor: Arc<dyn SubscriptionPersistor>) -> Self {
        Self { persistor }
    }

    pub fn write(&self, metadata: &SubscriptionMetadata) -> Result<()> {
        self.persistor.insert(metadata)
    }

    /// Write every entry, continuing past failures.
    pub fn write_all<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a SubscriptionMetadata>,
    ) -> Result<()> {
        let mut attempted = 0;
        let mut failures = Vec::new();

        for metadata in entries {
            attempted += 1;
            if let Err(e) = self.write(metadata) {
                warn!(id = %metadata.id(), error = %e, "Failed to write subscription");
                failures.push((metadata.id().to_string(), e.to_string()));
            }
        }

        batch_result(attempted, failures)
    }

    /// Delete by subscription id. Empty keys are rejected.
    pub fn delete(&self, key: &str) -> Result<()> {
        require_non_empty(key, "Subscription key cannot be null or empty")?;
        self.persistor.delete(key)
    }

    /// Delete every key, continuing past failures.
    pub fn delete_all<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut attempted = 0;
        let mut failures = Vec::new();

        for key in keys {
            attempted += 1;
            if let Err(e) = self.delete(key) {
                warn!(id = %key, error = %e, "Failed to delete subscription");
                failures.push((key.to_string(), e.to_string()));
            }
        }

        batch_result(attempted, failures)
    }
}

fn batch_result(attempted: usize, failures: Vec<(String, String)>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(StoreError::BatchFailed {
            attempted,
            failures,
        })
    }
}
