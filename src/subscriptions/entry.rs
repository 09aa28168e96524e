//! Cached subscription entries.

use super::activation::{ActivationProperties, Activator, LiveHandle, Subscription};
use super::factory::SubscriptionFactory;
use super::metadata::SubscriptionMetadata;
use crate::error::{Result, StoreError};
use std::sync::Arc;

/// One subscription in the cache: its metadata plus the live handle, if active.
///
/// Entries start unregistered. They become registered when a client inserts
/// a live subscription directly or a factory of the matching type activates
/// them, and go back to unregistered on removal or factory unbind.
#[derive(Debug)]
pub struct CachedSubscription {
    metadata: SubscriptionMetadata,
    handle: Option<LiveHandle>,
}

impl CachedSubscription {
    pub fn new(metadata: SubscriptionMetadata) -> Self {
        Self {
            metadata,
            handle: None,
        }
    }

    pub fn metadata(&self) -> &SubscriptionMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        self.metadata.id()
    }

    /// The live subscription, if registered.
    pub fn subscription(&self) -> Option<Arc<dyn Subscription>> {
        self.handle.as_ref().map(|h| Arc::clone(h.subscription()))
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_not_registered(&self) -> bool {
        self.handle.is_none()
    }

    pub fn is_type(&self, type_name: &str) -> bool {
        self.metadata.type_name() == type_name
    }

    pub fn is_not_type(&self, type_name: &str) -> bool {
        !self.is_type(type_name)
    }

    /// Activate a live subscription the caller already holds.
    pub fn register_subscription(
        &mut self,
        subscription: Arc<dyn Subscription>,
        activator: &Arc<dyn Activator>,
    ) -> Result<()> {
        if self.handle.is_some() {
            return Err(StoreError::Registration(format!(
                "Subscription [{}] is already registered",
                self.metadata.id()
            )));
        }

        let properties = ActivationProperties {
            subscription_id: self.metadata.id().to_string(),
            event_endpoint: self.metadata.callback_address().to_string(),
        };
        self.handle = Some(LiveHandle::activate(activator, subscription, &properties)?);
        Ok(())
    }

    /// Build the live subscription with `factory` and activate it.
    pub fn register_with_factory(
        &mut self,
        factory: &dyn SubscriptionFactory,
        activator: &Arc<dyn Activator>,
    ) -> Result<()> {
        if self.is_not_type(factory.type_name()) {
            return Err(StoreError::Registration(format!(
                "Factory of type [{}] cannot build subscription [{}] of type [{}]",
                factory.type_name(),
                self.metadata.id(),
                self.metadata.type_name()
            )));
        }

        let subscription = factory.create_subscription(&self.metadata).ok_or_else(|| {
            StoreError::Registration(format!(
                "Factory of type [{}] returned no subscription for [{}]",
                factory.type_name(),
                self.metadata.id()
            ))
        })?;

        self.register_subscription(subscription, activator)
    }

    /// Deactivate and return the live subscription. Fails if not registered.
    pub fn unregister_subscription(&mut self) -> Result<Arc<dyn Subscription>> {
        let handle = self.handle.take().ok_or_else(|| {
            StoreError::Registration(format!(
                "Subscription [{}] is not registered",
                self.metadata.id()
            ))
        })?;
        Ok(handle.release())
    }
}
