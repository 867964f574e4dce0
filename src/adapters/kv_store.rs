//! Key-value storage adapters.
//!
//! Implements [`StoragePort`] (state blobs) and [`ConfigPort`] (tracker
//! configuration) for host platforms.
//!
//! - [`MemoryStore`]: in-process map; tests and throwaway runs.
//! - [`FileStore`]: one file per key under a root directory.  Writes go
//!   to a temporary file that is renamed over the target, so a reader
//!   never sees a torn blob.
//! - [`JsonConfigFile`]: a single JSON config file, validated on save.
//!
//! Config is stored as JSON (`serde_json`); state blobs are opaque bytes
//! produced by [`persistence`](crate::persistence).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{ConfigOverlay, TrackerConfig};

const CONFIG_NAMESPACE: &str = "pelletgauge";
const CONFIG_KEY: &str = "config";

// ───────────────────────────────────────────────────────────────
// MemoryStore
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Number of stored keys across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.entries
            .get(&Self::composite_key(namespace, key))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.entries
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.entries.remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .contains_key(&Self::composite_key(namespace, key))
    }
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<TrackerConfig, ConfigError> {
        load_stored_config(self)
    }

    fn save(&mut self, config: &TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = serde_json::to_vec(config).map_err(|_| ConfigError::IoError)?;
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)
    }
}

// ───────────────────────────────────────────────────────────────
// FileStore
// ───────────────────────────────────────────────────────────────

/// Directory-backed store: `<root>/<namespace>/<key>.bin`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| map_io(&e))?;
        info!("FileStore: using {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{}.bin", key))
    }
}

impl StoragePort for FileStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.path_for(namespace, key)).map_err(|e| map_io(&e))
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(namespace, key);
        write_atomic(&path, data).map_err(|e| {
            warn!("FileStore: write {} failed: {}", path.display(), e);
            map_io(&e)
        })
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(&e)),
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.path_for(namespace, key).is_file()
    }
}

// ───────────────────────────────────────────────────────────────
// JsonConfigFile
// ───────────────────────────────────────────────────────────────

/// A tracker configuration kept in one JSON file.
///
/// The file holds the base fields at the top level and, optionally, user
/// overrides under `"options"`; the two are resolved on load.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<TrackerConfig, ConfigError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let file: ConfigFile = serde_json::from_slice(&bytes).map_err(|e| {
                    warn!("Config {} is not valid JSON: {}", self.path.display(), e);
                    ConfigError::Corrupted
                })?;
                let config = match &file.options {
                    Some(overlay) => file.data.with_overlay(overlay),
                    None => file.data,
                };
                config.validate()?;
                info!("Config loaded from {}", self.path.display());
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", self.path.display());
                Ok(TrackerConfig::default())
            }
            Err(e) => {
                warn!("Config read {} failed: {}", self.path.display(), e);
                Err(ConfigError::IoError)
            }
        }
    }

    fn save(&mut self, config: &TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::IoError)?;
        write_atomic(&self.path, &bytes).map_err(|e| {
            warn!("Config write {} failed: {}", self.path.display(), e);
            ConfigError::IoError
        })
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    data: TrackerConfig,
    #[serde(default)]
    options: Option<ConfigOverlay>,
}

// ───────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────

/// Read the config blob from a key-value store.  Only a missing key means
/// "use the defaults"; any other storage failure is reported.
fn load_stored_config(storage: &impl StoragePort) -> Result<TrackerConfig, ConfigError> {
    match storage.read(CONFIG_NAMESPACE, CONFIG_KEY) {
        Ok(bytes) => decode_config(&bytes),
        Err(StorageError::NotFound) => {
            debug!("No stored config, using defaults");
            Ok(TrackerConfig::default())
        }
        Err(e) => {
            warn!("Stored config read failed: {}", e);
            Err(ConfigError::IoError)
        }
    }
}

fn decode_config(bytes: &[u8]) -> Result<TrackerConfig, ConfigError> {
    let config: TrackerConfig = serde_json::from_slice(bytes).map_err(|e| {
        warn!("Stored config is not valid JSON: {}", e);
        ConfigError::Corrupted
    })?;
    config.validate()?;
    Ok(config)
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

fn map_io(e: &io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}
