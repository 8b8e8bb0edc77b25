//! Catalog stores.
//!
//! A [`CatalogStore`] only moves bytes; the provided `load`/`save` methods run
//! them through the codec so every backend gets the same trust rules.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use shell_catalog_core::Catalog;
use tracing::{debug, warn};

use crate::codec::{self, CacheMiss};
use crate::error::{Result, StoreError};

/// Persistent storage for one catalog.
pub trait CatalogStore: Send + Sync {
    /// Reads the raw record, or `None` when nothing was persisted.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replaces the raw record.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Loads the persisted catalog, reporting why it was not trusted.
    fn load_with_reason(&self) -> std::result::Result<Catalog, CacheMiss> {
        match self.read() {
            Ok(Some(bytes)) => codec::load_with_reason(&bytes),
            Ok(None) => Err(CacheMiss::Absent),
            Err(err) => Err(CacheMiss::Unreadable(err.to_string())),
        }
    }

    /// Loads the persisted catalog; every miss is "no cache".
    fn load(&self) -> Option<Catalog> {
        match self.load_with_reason() {
            Ok(catalog) => Some(catalog),
            Err(miss) => {
                debug!(reason = %miss, "no usable catalog cache");
                None
            }
        }
    }

    /// Persists the catalog with a refreshed `last_scanned`.
    fn save(&self, catalog: &mut Catalog) -> Result<()> {
        let bytes = codec::save(catalog)?;
        self.write(&bytes)
    }
}

/// JSON file store.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated catalog behind.
#[derive(Debug, Clone)]
pub struct FileCatalogStore {
    path: PathBuf,
}

impl FileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "catalog".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CatalogStore for FileCatalogStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, bytes)?;
        if let Err(err) = fs::rename(&staging, &self.path) {
            warn!(path = %self.path.display(), error = %err, "catalog rename failed");
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        debug!(path = %self.path.display(), bytes = bytes.len(), "catalog persisted");
        Ok(())
    }
}

/// In-memory store, used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: Mutex<usize>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with raw bytes.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        *store.bytes.lock() = Some(bytes.into());
        store
    }

    /// Makes every subsequent write fail with [`StoreError::ReadOnly`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    /// Snapshot of the raw record.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.bytes.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        *self.bytes.lock() = Some(bytes.to_vec());
        *self.writes.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shell_catalog_core::CommandNode;

    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCatalogStore::new();
        assert!(store.load().is_none());
        assert_eq!(store.load_with_reason(), Err(CacheMiss::Absent));

        let mut catalog = Catalog::new();
        catalog.commands.push(CommandNode::root("kernel"));
        store.save(&mut catalog).unwrap();

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.load().unwrap(), catalog);
    }

    #[test]
    fn test_memory_store_injected_failure() {
        let store = MemoryCatalogStore::new();
        store.set_fail_writes(true);

        let err = store.save(&mut Catalog::new()).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let store = FileCatalogStore::new("/var/cache/shell/catalog.json");
        assert_eq!(
            store.staging_path(),
            PathBuf::from("/var/cache/shell/catalog.json.tmp")
        );
    }
}
