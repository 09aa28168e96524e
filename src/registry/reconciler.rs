//! Background cache reconciliation.

use super::locked::LockedContainer;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

const THREAD_NAME: &str = "subscription-reconciler";

/// Periodically reconciles a container's cache with its backing store.
///
/// Each pass runs under the container's write lock. Dropping the reconciler
/// stops the thread and waits for an in-flight pass to finish.
pub struct CacheReconciler {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CacheReconciler {
    /// Start reconciling every `interval` on a dedicated thread.
    pub fn spawn(container: Arc<LockedContainer>, interval: Duration) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(ticker) -> _ => match container.reconcile() {
                            Ok(stats) if stats.is_empty() => {}
                            Ok(stats) => debug!(
                                removed = ?stats.removed,
                                added = ?stats.added,
                                "Reconciliation pass repaired the cache"
                            ),
                            Err(e) => error!(error = %e, "Reconciliation pass failed"),
                        },
                    }
                }
                debug!("Reconciler stopped");
            })?;

        debug!(interval_ms = interval.as_millis() as u64, "Reconciler started");

        Ok(Self {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it. Safe to call more than once.
    pub fn shutdown(&mut self) {
        // Disconnecting the channel wakes the loop.
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Reconciler thread panicked");
            }
        }
    }
}

impl Drop for CacheReconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryPersistor, SubscriptionPersistor};
    use crate::registry::SubscriptionContainer;
    use crate::subscriptions::{ActiveSubscriptions, SubscriptionMetadata};
    use std::time::Instant;

    fn metadata(id: &str) -> SubscriptionMetadata {
        SubscriptionMetadata::with_id("A", "filter", "http://localhost:8993/cb", id).unwrap()
    }

    #[test]
    fn test_periodic_pass_repairs_drift() {
        let persistor = Arc::new(MemoryPersistor::with_entries(vec![metadata("y")]));
        let container = SubscriptionContainer::new(persistor.clone(), Arc::new(ActiveSubscriptions::new()));
        let locked = Arc::new(LockedContainer::new(container));
        locked.init().unwrap();

        let mut reconciler =
            CacheReconciler::spawn(Arc::clone(&locked), Duration::from_millis(10)).unwrap();
        assert!(reconciler.is_running());

        persistor.delete("y").unwrap();
        persistor.insert(&metadata("z")).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while locked.ids() != vec!["z".to_string()] && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(locked.ids(), vec!["z".to_string()]);
        // Only the external delete reached the backing store.
        assert_eq!(persistor.delete_count(), 1);

        reconciler.shutdown();
        assert!(!reconciler.is_running());
        reconciler.shutdown();
    }
}
