//! Immutable subscription metadata and the identifiers built from it.

use crate::error::{require_non_empty, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Prefix for generated subscription ids.
const URN_UUID: &str = "urn:uuid:";

/// Points at one subscription by id and type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionIdentifier {
    pub id: String,
    pub type_name: String,
}

impl SubscriptionIdentifier {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for SubscriptionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.id, self.type_name)
    }
}

/// The persisted half of a subscription request, as supplied by an endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedSubscription {
    /// Filter in whatever encoding the subscription type uses.
    pub filter: String,
    /// Where notifications are delivered.
    pub callback_address: String,
}

impl SerializedSubscription {
    pub fn new(filter: impl Into<String>, callback_address: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            callback_address: callback_address.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        require_non_empty(&self.filter, "Serialized filter string cannot be null or empty")?;
        require_non_empty(
            &self.callback_address,
            "Callback address cannot be null or empty",
        )
    }
}

/// Immutable description of a subscription as it is kept in the backing store.
///
/// Metadata values of the same type share a serialization format, so the
/// filter payload is opaque to the registry and only meaningful to the
/// factory bound for that type. Updates build a new value with the same id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetadataFields")]
pub struct SubscriptionMetadata {
    id: String,
    type_name: String,
    serialized_filter: String,
    callback_address: String,
}

/// Unchecked wire shape; decoding goes through [`SubscriptionMetadata::with_id`].
#[derive(Deserialize)]
struct MetadataFields {
    id: String,
    type_name: String,
    serialized_filter: String,
    callback_address: String,
}

impl TryFrom<MetadataFields> for SubscriptionMetadata {
    type Error = StoreError;

    fn try_from(fields: MetadataFields) -> Result<Self> {
        SubscriptionMetadata::with_id(
            fields.type_name,
            fields.serialized_filter,
            fields.callback_address,
            fields.id,
        )
    }
}

impl SubscriptionMetadata {
    /// Create metadata with a freshly generated `urn:uuid:` id.
    pub fn new(
        type_name: impl Into<String>,
        serialized_filter: impl Into<String>,
        callback_address: impl Into<String>,
    ) -> Result<Self> {
        Self::with_id(
            type_name,
            serialized_filter,
            callback_address,
            format!("{}{}", URN_UUID, Uuid::new_v4()),
        )
    }

    /// Create metadata under an existing id.
    pub fn with_id(
        type_name: impl Into<String>,
        serialized_filter: impl Into<String>,
        callback_address: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self> {
        let type_name = type_name.into();
        let serialized_filter = serialized_filter.into();
        let callback_address = callback_address.into();
        let id = id.into();

        require_non_empty(&type_name, "type cannot be null or empty")?;
        require_non_empty(&serialized_filter, "serializedFilter cannot be null or empty")?;
        require_non_empty(&callback_address, "callbackUrl cannot be null or empty")?;
        require_non_empty(&id, "id cannot be null or empty")?;
        validate_callback_address(&callback_address)?;

        debug!(
            id = %id,
            type_name = %type_name,
            callback = %callback_address,
            "Created subscription metadata"
        );

        Ok(Self {
            id,
            type_name,
            serialized_filter,
            callback_address,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn serialized_filter(&self) -> &str {
        &self.serialized_filter
    }

    pub fn callback_address(&self) -> &str {
        &self.callback_address
    }

    /// The identifier clients use to refer back to this subscription.
    pub fn identifier(&self) -> SubscriptionIdentifier {
        SubscriptionIdentifier::new(self.id.clone(), self.type_name.clone())
    }
}

/// Callback addresses must be absolute, hierarchical URLs.
fn validate_callback_address(address: &str) -> Result<()> {
    let url = Url::parse(address).map_err(|e| StoreError::InvalidCallback {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(StoreError::InvalidCallback {
            address: address.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }

    Ok(())
}
