//! Backing stores that subscriptions are durably recorded in.
//!
//! The registry only needs keyed insert and delete plus a full listing.
//! Replayed operations must be harmless: inserting an id that is already
//! stored and deleting an id that is missing are both no-ops.

mod file;
mod memory;

pub use file::FilePersistor;
pub use memory::MemoryPersistor;

use crate::error::Result;
use crate::subscriptions::SubscriptionMetadata;
use std::collections::HashMap;

/// Persistent storage for subscription metadata, keyed by subscription id.
pub trait SubscriptionPersistor: Send + Sync {
    /// Store or replace the metadata under its id.
    fn insert(&self, metadata: &SubscriptionMetadata) -> Result<()>;

    /// Remove the metadata stored under `id`, if any.
    fn delete(&self, id: &str) -> Result<()>;

    /// Everything currently stored.
    fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionMetadata>>;
}
