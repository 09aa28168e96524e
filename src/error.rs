//! Error types for the subscription store.

use thiserror::Error;

/// Broad category of a [`StoreError`].
///
/// Callers use this to choose a retry policy: validation failures are never
/// worth retrying, consistency failures point at a caller/registry bug, and
/// backend failures may be transient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller's input was invalid.
    Validation,
    /// The registry's internal consistency rules were violated.
    Consistency,
    /// The backing store failed.
    Backend,
}

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid subscription request: callback URL [{address}] was malformed: {reason}")]
    InvalidCallback { address: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Subscription [{0}] does not exist")]
    SubscriptionNotFound(String),

    #[error("Duplicate factory registered for type [{0}]. This is an API client error")]
    DuplicateFactory(String),

    #[error("Binding synchronization is wrong. No factory [{0}] exists to unbind")]
    FactoryNotBound(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Batch write failed for {} of {attempted} entries", .failures.len())]
    BatchFailed {
        attempted: usize,
        failures: Vec<(String, String)>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,
}

impl StoreError {
    /// Wrap a backing-store failure with context.
    pub fn backend(context: impl Into<String>, source: StoreError) -> Self {
        StoreError::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Which category this error falls into.
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::InvalidArgument(_)
            | StoreError::InvalidCallback { .. }
            | StoreError::InvalidConfig(_) => ErrorClass::Validation,
            StoreError::SubscriptionNotFound(_)
            | StoreError::DuplicateFactory(_)
            | StoreError::FactoryNotBound(_)
            | StoreError::Registration(_) => ErrorClass::Consistency,
            StoreError::Backend { .. }
            | StoreError::BatchFailed { .. }
            | StoreError::Io(_)
            | StoreError::Serialization(_)
            | StoreError::Deserialization(_)
            | StoreError::InvalidFormat(_)
            | StoreError::ChecksumMismatch { .. }
            | StoreError::Locked => ErrorClass::Backend,
        }
    }
}

/// JSON is only read for configuration documents.
impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidConfig(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Fail with [`StoreError::InvalidArgument`] if `value` is empty.
pub(crate) fn require_non_empty(value: &str, message: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidArgument(message.to_string()));
    }
    Ok(())
}
