//! The subscription container.

use crate::backend::SubscriptionPersistor;
use crate::cache::{Rejected, SubscriptionCache};
use crate::error::{require_non_empty, Result, StoreError};
use crate::subscriptions::{
    Activator, CachedSubscription, FactoryRegistry, SerializedSubscription, Subscription,
    SubscriptionFactory, SubscriptionIdentifier, SubscriptionMetadata,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Cached ids that were gone from the backing store.
    pub removed: Vec<String>,
    /// Stored ids that were missing from the cache.
    pub added: Vec<String>,
}

impl ReconcileStats {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Cached access to every subscription registered from any endpoint.
///
/// None of these operations is atomic on its own: CRUD, the initial load,
/// factory binding and reconciliation must all be mutually exclusive. Mutating
/// methods take `&mut self`; share the container through
/// [`LockedContainer`](super::LockedContainer).
///
/// Redundant writes and deletes against the backing store are not errors,
/// since replayed events may repeat them.
pub struct SubscriptionContainer {
    cache: SubscriptionCache,
    factories: FactoryRegistry,
    activator: Arc<dyn Activator>,
}

impl SubscriptionContainer {
    pub fn new(persistor: Arc<dyn SubscriptionPersistor>, activator: Arc<dyn Activator>) -> Self {
        Self {
            cache: SubscriptionCache::new(persistor),
            factories: FactoryRegistry::new(),
            activator,
        }
    }

    /// Load stored subscriptions and activate those with a bound factory.
    pub fn init(&mut self) -> Result<()> {
        self.cache.load_all()?;

        let factories = &self.factories;
        let activator = &self.activator;
        let failures: Vec<String> = self
            .cache
            .values_mut()
            .filter(|entry| entry.is_not_registered())
            .filter_map(|entry| {
                let factory = factories.get(entry.metadata().type_name())?;
                entry
                    .register_with_factory(factory.as_ref(), activator)
                    .err()
                    .map(|e| {
                        warn!(id = %entry.id(), error = %e, "Could not activate subscription");
                        entry.id().to_string()
                    })
            })
            .collect();

        activation_result(failures)
    }

    /// The live subscription, if it exists, has the given type and is
    /// registered.
    ///
    /// Subscriptions that exist but are not yet activated (their factory is
    /// not bound) are reported as absent rather than as an error.
    pub fn get(&self, identifier: &SubscriptionIdentifier) -> Result<Option<Arc<dyn Subscription>>> {
        validate_identifier(identifier)?;

        let Some(entry) = self.cache.get(&identifier.id) else {
            return Ok(None);
        };
        if entry.is_not_type(&identifier.type_name) || entry.is_not_registered() {
            return Ok(None);
        }

        entry
            .subscription()
            .map(Some)
            .ok_or_else(|| StoreError::Registration("Could not get subscription".into()))
    }

    /// Activate `subscription`, then persist it. Returns its new identifier.
    ///
    /// If persisting fails the activation is rolled back.
    pub fn insert(
        &mut self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        type_name: &str,
    ) -> Result<SubscriptionIdentifier> {
        serialized.validate()?;
        require_non_empty(type_name, "Subscription type string cannot be null or empty")?;

        let metadata = SubscriptionMetadata::new(
            type_name,
            serialized.filter.clone(),
            serialized.callback_address.clone(),
        )?;
        let identifier = metadata.identifier();

        self.store_registered(metadata, subscription)?;
        Ok(identifier)
    }

    /// Replace an existing subscription, keeping its id.
    ///
    /// Runs as a delete followed by an insert. If the delete fails the
    /// original stays cached and active.
    pub fn update(
        &mut self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        identifier: &SubscriptionIdentifier,
    ) -> Result<()> {
        serialized.validate()?;
        self.validate_containment(identifier, "update")?;

        let metadata = SubscriptionMetadata::with_id(
            identifier.type_name.clone(),
            serialized.filter.clone(),
            serialized.callback_address.clone(),
            identifier.id.clone(),
        )?;

        let mut original = self
            .cache
            .remove(&identifier.id)
            .map_err(|e| StoreError::backend("Problem deleting from cache", e))?
            .ok_or_else(|| StoreError::SubscriptionNotFound(identifier.id.clone()))?;
        original.unregister_subscription()?;

        self.store_registered(metadata, subscription)
    }

    /// Remove a subscription and return its live object.
    ///
    /// The backing store delete happens first; the subscription is only
    /// deactivated once that succeeded.
    pub fn delete(&mut self, identifier: &SubscriptionIdentifier) -> Result<Arc<dyn Subscription>> {
        self.validate_containment(identifier, "delete")?;

        let mut entry = self
            .cache
            .remove(&identifier.id)
            .map_err(|e| StoreError::backend("Problem deleting from cache", e))?
            .ok_or_else(|| StoreError::SubscriptionNotFound(identifier.id.clone()))?;

        entry.unregister_subscription()
    }

    pub fn contains(&self, identifier: &SubscriptionIdentifier) -> Result<bool> {
        Ok(self.get(identifier)?.is_some())
    }

    /// Make a factory available and activate dormant subscriptions of its type.
    ///
    /// `None` is ignored. The factory stays bound even if some activations
    /// fail; those are reported in the returned error.
    pub fn bind_factory(&mut self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        let Some(factory) = factory else {
            debug!("Subscription container binding was given a null factory");
            return Ok(());
        };

        let type_name = factory.type_name().to_string();
        self.factories.bind(Arc::clone(&factory))?;
        debug!(type_name = %type_name, "SubscriptionFactory registered");

        let activator = &self.activator;
        let failures: Vec<String> = self
            .cache
            .values_mut()
            .filter(|entry| entry.is_not_registered() && entry.is_type(&type_name))
            .filter_map(|entry| {
                entry
                    .register_with_factory(factory.as_ref(), activator)
                    .err()
                    .map(|e| {
                        warn!(id = %entry.id(), error = %e, "Could not activate subscription");
                        entry.id().to_string()
                    })
            })
            .collect();

        activation_result(failures)
    }

    /// Withdraw a factory. Active subscriptions of its type go dormant.
    ///
    /// `None` is ignored.
    pub fn unbind_factory(&mut self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        let Some(factory) = factory else {
            debug!("Subscription container unbinding was given a null factory");
            return Ok(());
        };

        let type_name = factory.type_name().to_string();
        self.factories.unbind(&type_name)?;
        debug!(type_name = %type_name, "SubscriptionFactory removed");

        for entry in self.cache.values_mut() {
            if entry.is_registered() && entry.is_type(&type_name) {
                entry.unregister_subscription()?;
            }
        }
        Ok(())
    }

    /// Repair drift between the cache and the backing store.
    ///
    /// Ids gone from the store are dropped locally without another upstream
    /// delete. Ids missing from the cache are loaded and activated if their
    /// factory is bound. A changed payload under an unchanged id is not
    /// detected.
    pub fn reconcile(&mut self) -> Result<ReconcileStats> {
        let backend = self
            .cache
            .backend_snapshot()
            .map_err(|e| StoreError::backend("Could not read subscriptions from the backing store", e))?;

        let mut stats = ReconcileStats::default();

        let stale: Vec<String> = self
            .cache
            .keys()
            .filter(|id| !backend.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(mut entry) = self.cache.remove_locally(&id) {
                if entry.is_registered() {
                    entry.unregister_subscription()?;
                }
                stats.removed.push(id);
            }
        }

        for (id, metadata) in backend {
            if self.cache.contains_key(&id) {
                continue;
            }

            let mut entry = CachedSubscription::new(metadata);
            if let Some(factory) = self.factories.get(entry.metadata().type_name()) {
                if let Err(e) = entry.register_with_factory(factory.as_ref(), &self.activator) {
                    warn!(id = %id, error = %e, "Reconciled subscription left dormant");
                }
            }
            self.cache.insert_locally(entry);
            stats.added.push(id);
        }

        if !stats.is_empty() {
            warn!(
                removed = stats.removed.len(),
                added = stats.added.len(),
                "Subscription cache drifted from the backing store"
            );
        }
        Ok(stats)
    }

    /// Write every cached subscription back to the backing store.
    ///
    /// Repopulates a store that lost data without going through the
    /// reconciler, which would instead drop the missing entries.
    pub fn flush(&self) -> Result<()> {
        self.cache
            .flush()
            .map_err(|e| StoreError::backend("Problem writing to the cache", e))?;
        debug!(count = self.cache.len(), "Flushed subscription cache");
        Ok(())
    }

    /// Number of cached subscriptions, active or dormant.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cached subscription ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cache.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether a cached subscription is currently active.
    pub fn is_registered(&self, id: &str) -> bool {
        self.cache.get(id).is_some_and(|e| e.is_registered())
    }

    pub fn bound_types(&self) -> Vec<String> {
        self.factories.types()
    }

    /// Activate, then write through. Rolls back the activation on failure.
    fn store_registered(
        &mut self,
        metadata: SubscriptionMetadata,
        subscription: Arc<dyn Subscription>,
    ) -> Result<()> {
        let mut entry = CachedSubscription::new(metadata);
        entry.register_subscription(subscription, &self.activator)?;

        if let Err(Rejected { mut entry, error }) = self.cache.put(entry) {
            warn!(id = %entry.id(), error = %error, "Rolling back subscription registration");
            entry.unregister_subscription()?;
            return Err(StoreError::backend("Problem writing to the cache", error));
        }
        Ok(())
    }

    fn validate_containment(&self, identifier: &SubscriptionIdentifier, operation: &str) -> Result<()> {
        if self.get(identifier)?.is_none() {
            debug!(
                operation,
                id = %identifier.id,
                type_name = %identifier.type_name,
                "Target for subscription operation does not exist"
            );
            return Err(StoreError::SubscriptionNotFound(identifier.id.clone()));
        }
        Ok(())
    }
}

impl Drop for SubscriptionContainer {
    fn drop(&mut self) {
        let released = self
            .cache
            .values_mut()
            .filter(|entry| entry.is_registered())
            .filter_map(|entry| entry.unregister_subscription().ok())
            .count();
        if released > 0 {
            debug!(released, "Released live subscriptions");
        }
    }
}

fn validate_identifier(identifier: &SubscriptionIdentifier) -> Result<()> {
    require_non_empty(&identifier.id, "Subscription ID string cannot be null or empty")?;
    require_non_empty(
        &identifier.type_name,
        "Subscription type string cannot be null or empty",
    )
}

fn activation_result(failures: Vec<String>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Registration(format!(
            "Could not activate subscriptions: {}",
            failures.join(", ")
        )))
    }
}
