//! # Subscription Store
//!
//! A concurrent registry of event subscriptions, cached in memory and kept
//! in step with a persistent backing store.
//!
//! ## Core Concepts
//!
//! - **Metadata**: immutable, persisted description of a subscription
//! - **Live handles**: active registrations built by per-type factories
//! - **Write-through cache**: every change reaches the backing store first
//! - **Reconciliation**: a background pass repairs drift from the store
//!
//! ## Example
//!
//! ```ignore
//! use subscription_store::{
//!     ActiveSubscriptions, MemoryPersistor, SerializedSubscription, StoreConfig, SubscriptionStore,
//! };
//!
//! let store = SubscriptionStore::open(
//!     StoreConfig::default(),
//!     Arc::new(MemoryPersistor::new()),
//!     Arc::new(ActiveSubscriptions::new()),
//! )?;
//!
//! // Make stored "csw" subscriptions live
//! store.bind_factory(Some(Arc::new(CswFactory::new())))?;
//!
//! // Register a new one
//! let id = store.insert(
//!     subscription,
//!     &SerializedSubscription::new(filter_xml, "https://client.example.com/events"),
//!     "csw",
//! )?;
//! assert!(store.contains(&id)?);
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
pub mod store;
pub mod subscriptions;

// Re-exports
pub use backend::{FilePersistor, MemoryPersistor, SubscriptionPersistor};
pub use cache::{Rejected, SubscriptionCache, SubscriptionCacheLoader, SubscriptionCacheWriter};
pub use config::{FileBackendConfig, StoreConfig};
pub use error::{ErrorClass, Result, StoreError};
pub use registry::{CacheReconciler, LockedContainer, ReconcileStats, SubscriptionContainer};
pub use store::SubscriptionStore;
pub use subscriptions::{
    ActivationId, ActivationProperties, ActiveRegistration, ActiveSubscriptions, Activator,
    CachedSubscription, FactoryRegistry, LiveHandle, SerializedSubscription, Subscription,
    SubscriptionFactory, SubscriptionIdentifier, SubscriptionMetadata,
};
