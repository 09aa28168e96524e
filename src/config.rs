//! Store and backend configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Period between cache reconciliation passes, in milliseconds.
    /// Default: 60000
    pub reconcile_interval_ms: u64,

    /// Start the background reconciler on open.
    pub reconcile_enabled: bool,

    /// Load all subscriptions from the backing store on open.
    pub load_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_ms: 60_000,
            reconcile_enabled: true,
            load_on_open: true,
        }
    }
}

impl StoreConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms.max(1))
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// Configuration for [`FilePersistor`](crate::backend::FilePersistor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// Directory holding the subscription file and lock.
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./subscriptions"),
            create_if_missing: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, StoreError};
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = StoreConfig::from_json_str(r#"{"reconcile_interval_ms": 250}"#).unwrap();
        assert_eq!(config.reconcile_interval(), Duration::from_millis(250));
        assert!(config.reconcile_enabled);
        assert!(config.load_on_open);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = StoreConfig {
            reconcile_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.reconcile_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let err = StoreConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"reconcile_enabled": false}"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert!(!config.reconcile_enabled);
        assert_eq!(config.reconcile_interval_ms, 60_000);
        assert!(config.load_on_open);
    }

    #[test]
    fn test_from_json_file_missing() {
        let dir = TempDir::new().unwrap();
        let result = StoreConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
