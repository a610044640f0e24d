//! Durable storage for the fleet registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::record::ResourceRecord;
use crate::error::{Result, VtnError};

/// Full registry snapshot keyed by resource name.
pub type Snapshot = BTreeMap<String, ResourceRecord>;

/// Backing store for registry snapshots.
///
/// Every save replaces the whole stored state.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Loads the last saved snapshot, or an empty one if nothing was saved.
    async fn load(&self) -> Result<Snapshot>;

    /// Replaces the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// JSON file store: `<dir>/vens.json`, written via temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// File name used inside the data directory.
    pub const FILE_NAME: &'static str = "vens.json";

    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
        }
    }

    /// Path of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

fn storage_err(action: &str, path: &Path, e: impl std::fmt::Display) -> VtnError {
    VtnError::StorageFailure(format!("cannot {action} \"{}\": {e}", path.display()))
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no registry file, starting empty");
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(storage_err("read", &self.path, e)),
        };
        serde_json::from_str(&content).map_err(|e| storage_err("parse", &self.path, e))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| storage_err("create directory", dir, e))?;
        }

        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| storage_err("serialize", &self.path, e))?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| storage_err("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_err("replace", &self.path, e))?;

        debug!(path = %self.path.display(), records = snapshot.len(), "registry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        let mut record = ResourceRecord::new("ven_1");
        for s in 0..12 {
            let at = Utc.timestamp_opt(1_700_000_000 + s * 10, 0).unwrap();
            record.apply_report(s as f64, "voltage", at);
        }
        let mut snapshot = Snapshot::new();
        snapshot.insert(record.name.clone(), record);

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, snapshot);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, VtnError::StorageFailure(_)));
    }
}
