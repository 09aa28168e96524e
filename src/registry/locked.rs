//! Lock-serialized access to a [`SubscriptionContainer`].

use super::container::{ReconcileStats, SubscriptionContainer};
use crate::error::Result;
use crate::subscriptions::{
    SerializedSubscription, Subscription, SubscriptionFactory, SubscriptionIdentifier,
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shares a container between threads behind one read/write lock.
///
/// Lookups take the read lock; every mutation, including factory binding
/// and reconciliation, takes the write lock. Guards are released with
/// `unlock_fair` so a waiting writer is handed the lock before newly
/// arriving readers and vice versa. This is not transactional: each call is
/// serialized on its own.
pub struct LockedContainer {
    container: RwLock<SubscriptionContainer>,
}

impl LockedContainer {
    pub fn new(container: SubscriptionContainer) -> Self {
        Self {
            container: RwLock::new(container),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.write(|c| c.init())
    }

    pub fn get(&self, identifier: &SubscriptionIdentifier) -> Result<Option<Arc<dyn Subscription>>> {
        self.read(|c| c.get(identifier))
    }

    pub fn insert(
        &self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        type_name: &str,
    ) -> Result<SubscriptionIdentifier> {
        self.write(|c| c.insert(subscription, serialized, type_name))
    }

    pub fn update(
        &self,
        subscription: Arc<dyn Subscription>,
        serialized: &SerializedSubscription,
        identifier: &SubscriptionIdentifier,
    ) -> Result<()> {
        self.write(|c| c.update(subscription, serialized, identifier))
    }

    pub fn delete(&self, identifier: &SubscriptionIdentifier) -> Result<Arc<dyn Subscription>> {
        self.write(|c| c.delete(identifier))
    }

    pub fn contains(&self, identifier: &SubscriptionIdentifier) -> Result<bool> {
        self.read(|c| c.contains(identifier))
    }

    pub fn bind_factory(&self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        self.write(|c| c.bind_factory(factory))
    }

    pub fn unbind_factory(&self, factory: Option<Arc<dyn SubscriptionFactory>>) -> Result<()> {
        self.write(|c| c.unbind_factory(factory))
    }

    pub fn reconcile(&self) -> Result<ReconcileStats> {
        self.write(|c| c.reconcile())
    }

    pub fn flush(&self) -> Result<()> {
        self.write(|c| c.flush())
    }

    pub fn len(&self) -> usize {
        self.read(|c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read(|c| c.is_empty())
    }

    pub fn ids(&self) -> Vec<String> {
        self.read(|c| c.ids())
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.read(|c| c.is_registered(id))
    }

    pub fn bound_types(&self) -> Vec<String> {
        self.read(|c| c.bound_types())
    }

    fn read<T>(&self, f: impl FnOnce(&SubscriptionContainer) -> T) -> T {
        let guard = self.container.read();
        let result = f(&*guard);
        RwLockReadGuard::unlock_fair(guard);
        result
    }

    fn write<T>(&self, f: impl FnOnce(&mut SubscriptionContainer) -> T) -> T {
        let mut guard = self.container.write();
        let result = f(&mut *guard);
        RwLockWriteGuard::unlock_fair(guard);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryPersistor;
    use crate::subscriptions::{ActiveSubscriptions, SubscriptionMetadata};
    use std::thread;

    #[derive(Debug)]
    struct Probe;
    impl Subscription for Probe {}

    struct ProbeFactory(String);

    impl SubscriptionFactory for ProbeFactory {
        fn type_name(&self) -> &str {
            &self.0
        }

        fn create_subscription(&self, _: &SubscriptionMetadata) -> Option<Arc<dyn Subscription>> {
            Some(Arc::new(Probe))
        }
    }

    fn locked() -> (Arc<LockedContainer>, Arc<ActiveSubscriptions>) {
        let active = Arc::new(ActiveSubscriptions::new());
        let container =
            SubscriptionContainer::new(Arc::new(MemoryPersistor::new()), active.clone());
        (Arc::new(LockedContainer::new(container)), active)
    }

    #[test]
    fn test_concurrent_inserts_and_reads() {
        let (registry, active) = locked();
        let serialized = SerializedSubscription::new("filter", "http://localhost:8993/cb");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let serialized = serialized.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let id = registry.insert(Arc::new(Probe), &serialized, "A").unwrap();
                        assert!(registry.contains(&id).unwrap());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 200);
        assert_eq!(active.len(), 200);
    }

    #[test]
    fn test_bind_races_with_insert() {
        let (registry, active) = locked();
        let serialized = SerializedSubscription::new("filter", "http://localhost:8993/cb");

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let serialized = serialized.clone();
                thread::spawn(move || {
                    let type_name = format!("T{}", i);
                    for _ in 0..20 {
                        registry.insert(Arc::new(Probe), &serialized, &type_name).unwrap();
                    }
                    registry
                        .bind_factory(Some(Arc::new(ProbeFactory(type_name.clone()))))
                        .unwrap();
                    registry
                        .unbind_factory(Some(Arc::new(ProbeFactory(type_name))))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // Unbinding deactivated everything, but nothing was removed.
        assert_eq!(registry.len(), 80);
        assert!(active.is_empty());
        assert!(registry.bound_types().is_empty());
    }
}
