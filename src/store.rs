//! Main SubscriptionStore struct tying all components together.

use crate::backend::SubscriptionPersistor;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::registry::{CacheReconciler, LockedContainer, ReconcileStats, SubscriptionContainer};
use crate::subscriptions::{
    Activator, SerializedSubscription, Subscription, SubscriptionFactory, SubscriptionIdentifier,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// The subscription store.
///
/// Owns the locked container and, when enabled, the background reconciler.
/// Construct one per process at the entry point and pass it to whatever
/// endpoints accept subscription requests.
pub struct SubscriptionStore {
    /// Store configuration.
    config: StoreConfig,

    /// Shared with the reconciler thread.
    container: Arc<LockedContainer>,

    reconciler: Mutex<Option<CacheReconciler>>,
}

impl SubscriptionStore {
    /// Wire up the registry, load the backing store and start reconciling.
    pub fn open(
        config: StoreConfig,
        persistor: Arc<dyn SubscriptionPersistor>,
        activator: Arc<dyn Activator>,
    ) -> Result<Self> {
        let container = Arc::new(LockedContainer::new(SubscriptionContainer::new(
            persistor, activator,
        )));

        if config.load_on_open {
            container.init()?;
        }

        let reconciler = if config.reconcile_enabled {
            Some(CacheReconciler::spawn(
                Arc::clone(&container),
                config.reconcile_interval(),
            )?)
        } else {
            None
        };

        debug!(
            subscriptions = container.len(),
            reconcile = config.reconcile_enabled,
            "Subscription store opened"
        );

        Ok(Self {
            config,
            container,
            reconciler: Mutex::new(reconciler),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Subscription Operations ---

    pub fn get(&self, identifier: &SubscriptionIdentifier) -> Result<Option<Arc<dyn Subscription>>> {
        self.container.get(identifier)
    }

    pub fn insert(
        &self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        type_name: &str,
    ) -> Result<SubscriptionIdentifier> {
        self.container.insert(subscription, serialized, type_name)
    }

    pub fn update(
        &self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        identifier: &SubscriptionIdentifier,
    ) -> Result<()> {
        self.container.update(subscription, serialized, identifier)
    }

    pub fn delete(&self, identifier: &SubscriptionIdentifier) -> Result<Arc<dyn Subscription>> {
        self.container.delete(identifier)
    }

    pub fn contains(&self, identifier: &SubscriptionIdentifier) -> Result<bool> {
        self.container.contains(identifier)
    }

    // --- Factory Operations ---

    pub fn bind_factory(&self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        self.container.bind_factory(factory)
    }

    pub fn unbind_factory(&self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        self.container.unbind_factory(factory)
    }

    // --- Maintenance ---

    /// Run one reconciliation pass now, on the calling thread.
    pub fn reconcile_now(&self) -> Result<ReconcileStats> {
        self.container.reconcile()
    }

    /// Write every cached subscription back to the backing store.
    pub fn flush(&self) -> Result<()> {
        self.container.flush()
    }

    pub fn is_reconciling(&self) -> bool {
        self.reconciler
            .lock()
            .as_ref()
            .is_some_and(|r| r.is_running())
    }

    /// Stop the background reconciler. The store stays usable.
    pub fn shutdown(&self) {
        if let Some(mut reconciler) = self.reconciler.lock().take() {
            reconciler.shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.container.ids()
    }
}

impl Drop for SubscriptionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
