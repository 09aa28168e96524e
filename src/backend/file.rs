//! File-backed persistor.
//!
//! All subscriptions live in one snapshot file, rewritten on every change:
//!
//! ```text
//! magic "SUB\0" | version u8 | len u64 LE | MessagePack map | crc32 u32 LE
//! ```
//!
//! Writes go to a temporary file that is synced and renamed over the
//! previous snapshot. A `LOCK` file held exclusively keeps other processes out.

use super::SubscriptionPersistor;
use crate::config::FileBackendConfig;
use crate::error::{Result, StoreError};
use crate::subscriptions::SubscriptionMetadata;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes for the subscription file.
const SUBSCRIPTIONS_MAGIC: &[u8; 4] = b"SUB\0";

/// Current subscription file format version.
const SUBSCRIPTIONS_VERSION: u8 = 1;

const DATA_FILE: &str = "subscriptions.bin";
const TEMP_FILE: &str = "subscriptions.bin.tmp";
const LOCK_FILE: &str = "LOCK";

/// Magic, version and length prefix.
const HEADER_LEN: u64 = 13;

/// Trailing CRC32.
const CHECKSUM_LEN: u64 = 4;

/// Durable [`SubscriptionPersistor`] storing a snapshot file in a directory.
pub struct FilePersistor {
    dir: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    entries: RwLock<BTreeMap<String, SubscriptionMetadata>>,
}

impl FilePersistor {
    /// Open the directory, creating it if configured to.
    pub fn open(config: FileBackendConfig) -> Result<Self> {
        if !config.path.exists() {
            if !config.create_if_missing {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("subscription directory {} does not exist", config.path.display()),
                )));
            }
            fs::create_dir_all(&config.path)?;
        }

        let lock_file = Self::acquire_lock(&config.path)?;

        let data_path = config.path.join(DATA_FILE);
        let entries = if data_path.exists() {
            Self::read_snapshot(&data_path)?
        } else {
            BTreeMap::new()
        };

        debug!(
            path = %config.path.display(),
            count = entries.len(),
            "Opened file subscription backend"
        );

        Ok(Self {
            dir: config.path,
            _lock_file: lock_file,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join(LOCK_FILE))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }

    fn write_snapshot(&self, entries: &BTreeMap<String, SubscriptionMetadata>) -> Result<()> {
        let encoded = rmp_serde::to_vec_named(entries)?;
        let checksum = crc32fast::hash(&encoded);

        let temp_path = self.dir.join(TEMP_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        file.write_all(SUBSCRIPTIONS_MAGIC)?;
        file.write_all(&[SUBSCRIPTIONS_VERSION])?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;
        file.write_all(&checksum.to_le_bytes())?;
        file.sync_all()?;

        fs::rename(&temp_path, self.dir.join(DATA_FILE))?;
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<BTreeMap<String, SubscriptionMetadata>> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SUBSCRIPTIONS_MAGIC {
            return Err(StoreError::InvalidFormat(
                "Invalid subscription file magic".into(),
            ));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != SUBSCRIPTIONS_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported subscription file version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let available = file
            .metadata()?
            .len()
            .saturating_sub(HEADER_LEN + CHECKSUM_LEN);
        if len > available {
            return Err(StoreError::InvalidFormat(
                "Subscription file length exceeds file size".into(),
            ));
        }

        let mut encoded = vec![0u8; len as usize];
        file.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(StoreError::ChecksumMismatch { expected, got });
        }

        Ok(rmp_serde::from_slice(&encoded)?)
    }
}

impl SubscriptionPersistor for FilePersistor {
    fn insert(&self, metadata: &SubscriptionMetadata) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.get(metadata.id()) == Some(metadata) {
            return Ok(());
        }

        let previous = entries.insert(metadata.id().to_string(), metadata.clone());
        if let Err(e) = self.write_snapshot(&entries) {
            match previous {
                Some(previous) => entries.insert(metadata.id().to_string(), previous),
                None => entries.remove(metadata.id()),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(id) else {
            return Ok(());
        };

        if let Err(e) = self.write_snapshot(&entries) {
            entries.insert(id.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionMetadata>> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> FileBackendConfig {
        FileBackendConfig {
            path: dir.path().join("subs"),
            create_if_missing: true,
        }
    }

    fn metadata(id: &str, filter: &str) -> SubscriptionMetadata {
        SubscriptionMetadata::with_id("csw", filter, "https://example.com/events", id).unwrap()
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        {
            let persistor = FilePersistor::open(config(&dir)).unwrap();
            persistor.insert(&metadata("a", "<filter/>")).unwrap();
            persistor.insert(&metadata("b", "<filter/>")).unwrap();
            persistor.delete("a").unwrap();
        }

        let persistor = FilePersistor::open(config(&dir)).unwrap();
        let all = persistor.get_subscriptions().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["b"], metadata("b", "<filter/>"));
    }

    #[test]
    fn test_insert_replaces() {
        let dir = TempDir::new().unwrap();
        let persistor = FilePersistor::open(config(&dir)).unwrap();
        persistor.insert(&metadata("a", "one")).unwrap();
        persistor.insert(&metadata("a", "two")).unwrap();
        assert_eq!(persistor.len(), 1);
        assert_eq!(persistor.get_subscriptions().unwrap()["a"].serialized_filter(), "two");
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let persistor = FilePersistor::open(config(&dir)).unwrap();
        persistor.delete("nope").unwrap();
        assert!(persistor.is_empty());
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _first = FilePersistor::open(config(&dir)).unwrap();
        assert!(matches!(
            FilePersistor::open(config(&dir)),
            Err(StoreError::Locked)
        ));
    }

    #[test]
    fn test_missing_dir_without_create() {
        let dir = TempDir::new().unwrap();
        let result = FilePersistor::open(FileBackendConfig {
            path: dir.path().join("absent"),
            create_if_missing: false,
        });
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_corruption_detected() {
        let dir = TempDir::new().unwrap();
        {
            let persistor = FilePersistor::open(config(&dir)).unwrap();
            persistor.insert(&metadata("a", "filter")).unwrap();
        }

        let data_path = dir.path().join("subs").join(DATA_FILE);
        let mut bytes = fs::read(&data_path).unwrap();
        let mid = HEADER_LEN as usize + (bytes.len() - 17) / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&data_path, bytes).unwrap();

        assert!(matches!(
            FilePersistor::open(config(&dir)),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("subs")).unwrap();
        fs::write(dir.path().join("subs").join(DATA_FILE), b"XXXX\x01").unwrap();

        assert!(matches!(
            FilePersistor::open(config(&dir)),
            Err(StoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_oversized_length_header() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("subs")).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(SUBSCRIPTIONS_MAGIC);
        bytes.push(SUBSCRIPTIONS_VERSION);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        fs::write(dir.path().join("subs").join(DATA_FILE), bytes).unwrap();

        match FilePersistor::open(config(&dir)) {
            Err(StoreError::InvalidFormat(msg)) => assert!(msg.contains("exceeds file size")),
            other => panic!("expected InvalidFormat, got {:?}", other.map(|p| p.len())),
        }
    }
}
