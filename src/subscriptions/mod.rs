//! Subscription values and their activation lifecycle.
//!
//! - [`SubscriptionMetadata`]: immutable, persisted description
//! - [`CachedSubscription`]: metadata plus an optional live handle
//! - [`SubscriptionFactory`] / [`FactoryRegistry`]: per-type activation
//! - [`Activator`]: where live subscriptions are registered

mod activation;
mod entry;
mod factory;
mod metadata;

pub use activation::{
    ActivationId, ActivationProperties, ActiveRegistration, ActiveSubscriptions, Activator,
    LiveHandle, Subscription,
};
pub use entry::CachedSubscription;
pub use factory::{FactoryRegistry, SubscriptionFactory};
pub use metadata::{SerializedSubscription, SubscriptionIdentifier, SubscriptionMetadata};
