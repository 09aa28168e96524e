//! Type-specific subscription factories.

use super::activation::Subscription;
use super::metadata::SubscriptionMetadata;
use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds live subscriptions of one type from their stored metadata.
///
/// Clients that expose subscription endpoints should bind their factory
/// before, or together with, those endpoints. Until then stored
/// subscriptions of the type stay dormant and lookups report them missing.
pub trait SubscriptionFactory: Send + Sync {
    /// The subscription type this factory handles.
    fn type_name(&self) -> &str;

    /// Build a live subscription. `None` is treated as an activation failure.
    fn create_subscription(&self, metadata: &SubscriptionMetadata) -> Option<Arc<dyn Subscription>>;
}

/// At most one factory per type name.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn SubscriptionFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, factory: Arc<dyn SubscriptionFactory>) -> Result<()> {
        let type_name = factory.type_name().to_string();
        if self.factories.contains_key(&type_name) {
            return Err(StoreError::DuplicateFactory(type_name));
        }
        self.factories.insert(type_name, factory);
        Ok(())
    }

    pub fn unbind(&mut self, type_name: &str) -> Result<Arc<dyn SubscriptionFactory>> {
        self.factories
            .remove(type_name)
            .ok_or_else(|| StoreError::FactoryNotBound(type_name.to_string()))
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn SubscriptionFactory>> {
        self.factories.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Bound type names, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
}
