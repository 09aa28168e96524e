//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use subscription_store::{
    MemoryPersistor, Result, StoreError, Subscription, SubscriptionFactory, SubscriptionMetadata,
    SubscriptionPersistor,
};

pub const CALLBACK: &str = "http://localhost:8993/services/csw/subscription/event";

/// A live subscription that remembers what it was built from.
#[derive(Debug)]
pub struct TestSubscription {
    pub label: String,
}

impl TestSubscription {
    pub fn new(label: &str) -> Arc<dyn Subscription> {
        Arc::new(Self {
            label: label.to_string(),
        })
    }
}

impl Subscription for TestSubscription {}

/// Factory that records the ids it built subscriptions for.
pub struct TestFactory {
    type_name: String,
    built: Mutex<Vec<String>>,
}

impl TestFactory {
    pub fn new(type_name: &str) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.to_string(),
            built: Mutex::new(Vec::new()),
        })
    }

    pub fn built(&self) -> Vec<String> {
        self.built.lock().clone()
    }
}

impl SubscriptionFactory for TestFactory {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create_subscription(&self, metadata: &SubscriptionMetadata) -> Option<Arc<dyn Subscription>> {
        self.built.lock().push(metadata.id().to_string());
        Some(TestSubscription::new(metadata.serialized_filter()))
    }
}

/// Wraps a [`MemoryPersistor`] and fails on demand.
#[derive(Default)]
pub struct FlakyPersistor {
    pub inner: MemoryPersistor,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyPersistor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

fn unavailable() -> StoreError {
    StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "backing store unavailable",
    ))
}

impl SubscriptionPersistor for FlakyPersistor {
    fn insert(&self, metadata: &SubscriptionMetadata) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.insert(metadata)
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.delete(id)
    }

    fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionMetadata>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.get_subscriptions()
    }
}

pub fn stored(id: &str, type_name: &str) -> SubscriptionMetadata {
    SubscriptionMetadata::with_id(type_name, "<ogc:Filter/>", CALLBACK, id).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
