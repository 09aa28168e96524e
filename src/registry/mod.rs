//! The subscription registry: container, lock decorator and reconciler.
//!
//! ```ignore
//! let container = SubscriptionContainer::new(persistor, activator);
//! let registry = Arc::new(LockedContainer::new(container));
//! registry.init()?;
//!
//! let reconciler = CacheReconciler::spawn(Arc::clone(&registry), Duration::from_secs(60))?;
//!
//! registry.bind_factory(Some(csw_factory))?;
//! let id = registry.insert(subscription, &serialized, "csw")?;
//! ```

mod container;
mod locked;
mod reconciler;

pub use container::{ReconcileStats, SubscriptionContainer};
pub use locked::LockedContainer;
pub use reconciler::CacheReconciler;
