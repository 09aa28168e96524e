//! Live subscription handles and the activator they are registered with.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A client's live subscription object.
///
/// Opaque to the registry: it is held while active and handed back on
/// delete. Matching and delivery belong to whoever consumes activations.
pub trait Subscription: Send + Sync + fmt::Debug {}

/// Identifies one activation with an [`Activator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActivationId(pub u64);

/// Properties a subscription is activated under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivationProperties {
    pub subscription_id: String,
    pub event_endpoint: String,
}

/// Where live subscriptions are registered so events can reach them.
pub trait Activator: Send + Sync {
    /// Register a live subscription. `None` means activation failed.
    fn activate(
        &self,
        subscription: Arc<dyn Subscription>,
        properties: &ActivationProperties,
    ) -> Option<ActivationId>;

    /// Remove a previous activation.
    fn deactivate(&self, id: ActivationId);
}

/// An active registration. Released exactly once by consuming it.
pub struct LiveHandle {
    subscription: Arc<dyn Subscription>,
    activation: ActivationId,
    activator: Arc<dyn Activator>,
}

impl LiveHandle {
    pub(crate) fn activate(
        activator: &Arc<dyn Activator>,
        subscription: Arc<dyn Subscription>,
        properties: &ActivationProperties,
    ) -> Result<Self> {
        let activation = activator
            .activate(Arc::clone(&subscription), properties)
            .ok_or_else(|| {
                StoreError::Registration(format!(
                    "Could not activate subscription [{}]",
                    properties.subscription_id
                ))
            })?;

        Ok(Self {
            subscription,
            activation,
            activator: Arc::clone(activator),
        })
    }

    pub fn subscription(&self) -> &Arc<dyn Subscription> {
        &self.subscription
    }

    /// Deactivate and hand back the subscription object.
    pub(crate) fn release(self) -> Arc<dyn Subscription> {
        self.activator.deactivate(self.activation);
        self.subscription
    }
}

impl fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveHandle")
            .field("subscription", &self.subscription)
            .field("activation", &self.activation)
            .finish()
    }
}

/// One entry in [`ActiveSubscriptions`].
#[derive(Clone, Debug)]
pub struct ActiveRegistration {
    pub subscription: Arc<dyn Subscription>,
    pub properties: ActivationProperties,
}

/// In-process [`Activator`] that tracks every active registration.
pub struct ActiveSubscriptions {
    registrations: RwLock<HashMap<ActivationId, ActiveRegistration>>,
    next_id: AtomicU64,
}

impl ActiveSubscriptions {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    /// Number of active registrations for a subscription id.
    pub fn count_for(&self, subscription_id: &str) -> usize {
        self.registrations
            .read()
            .values()
            .filter(|r| r.properties.subscription_id == subscription_id)
            .count()
    }

    pub fn is_active(&self, subscription_id: &str) -> bool {
        self.count_for(subscription_id) > 0
    }

    /// Registrations delivering to the given endpoint.
    pub fn for_endpoint(&self, event_endpoint: &str) -> Vec<ActiveRegistration> {
        self.registrations
            .read()
            .values()
            .filter(|r| r.properties.event_endpoint == event_endpoint)
            .cloned()
            .collect()
    }
}

impl Default for ActiveSubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Activator for ActiveSubscriptions {
    fn activate(
        &self,
        subscription: Arc<dyn Subscription>,
        properties: &ActivationProperties,
    ) -> Option<ActivationId> {
        let id = ActivationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.registrations.write().insert(
            id,
            ActiveRegistration {
                subscription,
                properties: properties.clone(),
            },
        );
        Some(id)
    }

    fn deactivate(&self, id: ActivationId) {
        self.registrations.write().remove(&id);
    }
}
