//! Fleet registry: the source of truth for VEN identity and telemetry.
//!
//! All mutations run under one lock spanning "mutate then persist", so
//! operations on the same name are observed in request order. A failed
//! save rolls the in-memory change back before the error is returned.
//! A save that outlives its timeout is left to finish and then overwritten
//! with the rolled-back state, so the store never keeps a change the
//! caller was told failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::record::{ResourceRecord, ResourceStatus};
use super::store::{RegistryStore, Snapshot};
use crate::error::{Result, VtnError};

/// Tunables for a [`FleetRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    /// Nominal interval between VEN check-ins.
    pub expected_check_in: Duration,
    /// Upper bound on a single store operation.
    pub io_timeout: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            expected_check_in: Duration::from_secs(10),
            io_timeout: Duration::from_secs(5),
        }
    }
}

/// Registered VENs keyed by name, backed by a [`RegistryStore`].
pub struct FleetRegistry {
    records: Mutex<Snapshot>,
    store: Arc<dyn RegistryStore>,
    settings: RegistrySettings,
}

impl FleetRegistry {
    /// Opens a registry, loading whatever the store currently holds.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the store cannot be read.
    pub async fn open(store: Arc<dyn RegistryStore>, settings: RegistrySettings) -> Result<Self> {
        let records = with_timeout(settings.io_timeout, store.load()).await?;
        info!(count = records.len(), "fleet registry loaded");
        Ok(Self {
            records: Mutex::new(records),
            store,
            settings,
        })
    }

    /// Registers a new VEN under `name` with fresh identifiers.
    ///
    /// # Errors
    ///
    /// `DuplicateResource` if the name is taken, `StorageFailure` if the
    /// change could not be persisted (the registration is then undone).
    pub async fn register(&self, name: &str) -> Result<ResourceRecord> {
        let mut records = self.records.lock().await;
        if records.contains_key(name) {
            return Err(VtnError::DuplicateResource(name.to_string()));
        }

        let record = ResourceRecord::new(name);
        records.insert(name.to_string(), record.clone());
        self.persist(&mut records, |r| {
            r.remove(name);
        })
        .await?;

        info!(ven = name, ven_id = %record.resource_id, "VEN registered");
        Ok(record)
    }

    /// Removes the VEN registered under `name`.
    ///
    /// # Errors
    ///
    /// `UnknownResource` if absent, `StorageFailure` if the removal could
    /// not be persisted (the record is then restored).
    pub async fn remove(&self, name: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        let removed = records
            .remove(name)
            .ok_or_else(|| VtnError::UnknownResource(name.to_string()))?;

        self.persist(&mut records, |r| {
            r.insert(name.to_string(), removed);
        })
        .await?;

        info!(ven = name, "VEN removed");
        Ok(())
    }

    /// Returns the record registered under `name`.
    pub async fn lookup_by_name(&self, name: &str) -> Result<ResourceRecord> {
        self.records
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| VtnError::UnknownResource(name.to_string()))
    }

    /// Returns the record whose `resource_id` equals `id`.
    ///
    /// Linear scan over all records.
    pub async fn lookup_by_id(&self, id: &str) -> Result<ResourceRecord> {
        self.records
            .lock()
            .await
            .values()
            .find(|r| r.resource_id == id)
            .cloned()
            .ok_or_else(|| VtnError::UnknownResource(id.to_string()))
    }

    /// Resolves `key` as a name first, then as a resource id.
    pub async fn resolve(&self, key: &str) -> Result<ResourceRecord> {
        match self.lookup_by_name(key).await {
            Ok(record) => Ok(record),
            Err(_) => self.lookup_by_id(key).await,
        }
    }

    /// Stores a telemetry report and counts it as a check-in.
    ///
    /// # Errors
    ///
    /// `UnknownResource` if absent, `StorageFailure` if the report could
    /// not be persisted (the previous telemetry is then restored).
    pub async fn record_report(
        &self,
        name: &str,
        value: f64,
        units: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(name)
            .ok_or_else(|| VtnError::UnknownResource(name.to_string()))?;
        let previous = record.clone();
        record.apply_report(value, units, at);

        self.persist(&mut records, |r| {
            r.insert(name.to_string(), previous);
        })
        .await
    }

    /// Connection quality of the VEN registered under `name`.
    pub async fn connection_quality(&self, name: &str) -> Result<f64> {
        let records = self.records.lock().await;
        let record = records
            .get(name)
            .ok_or_else(|| VtnError::UnknownResource(name.to_string()))?;
        Ok(record
            .check_in_history
            .connection_quality(self.settings.expected_check_in))
    }

    /// All records, ordered by name.
    pub async fn list_all(&self) -> Vec<ResourceRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// All records annotated with their connection quality, ordered by name.
    pub async fn list_all_with_quality(&self) -> Vec<ResourceStatus> {
        let expected = self.settings.expected_check_in;
        self.records
            .lock()
            .await
            .values()
            .map(|record| ResourceStatus {
                connection_quality: record.check_in_history.connection_quality(expected),
                record: record.clone(),
            })
            .collect()
    }

    /// Flushes the current state to the store.
    ///
    /// Called once at shutdown.
    pub async fn close(&self) -> Result<()> {
        let mut records = self.records.lock().await;
        self.persist(&mut records, |_| {}).await?;
        info!(count = records.len(), "fleet registry closed");
        Ok(())
    }

    /// Saves `records`, applying `rollback` to them if the save fails.
    async fn persist(
        &self,
        records: &mut Snapshot,
        rollback: impl FnOnce(&mut Snapshot),
    ) -> Result<()> {
        let limit = self.settings.io_timeout;
        let mut save = self.spawn_save(records.clone());

        let err = match tokio::time::timeout(limit, &mut save).await {
            Ok(joined) => match joined_result(joined) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            },
            Err(_) => {
                warn!(?limit, "registry save timed out, restoring stored state");
                rollback(records);
                if let Err(e) = joined_result(save.await) {
                    debug!(error = %e, "timed-out save failed");
                }
                if let Err(e) = joined_result(self.spawn_save(records.clone()).await) {
                    error!(error = %e, "failed to restore stored registry");
                }
                let err = VtnError::StorageFailure(format!(
                    "store operation timed out after {limit:?}"
                ));
                error!(error = %err, "failed to persist fleet registry");
                return Err(err);
            }
        };

        rollback(records);
        error!(error = %err, "failed to persist fleet registry");
        Err(err)
    }

    fn spawn_save(&self, snapshot: Snapshot) -> JoinHandle<Result<()>> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.save(&snapshot).await })
    }
}

fn joined_result(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| VtnError::StorageFailure(format!("save task failed: {e}")))?
}

async fn with_timeout<T>(
    limit: Duration,
    op: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, op).await.map_err(|_| {
        VtnError::StorageFailure(format!("store operation timed out after {limit:?}"))
    })?
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::fleet::record::CHECK_IN_CAPACITY;
    use crate::fleet::store::JsonFileStore;

    /// In-memory store whose saves can be made to fail or stall on demand.
    ///
    /// Every save yields once before committing.
    #[derive(Default)]
    struct FlakyStore {
        saved: std::sync::Mutex<Snapshot>,
        fail: AtomicBool,
        stall_next: AtomicBool,
    }

    #[async_trait]
    impl RegistryStore for FlakyStore {
        async fn load(&self) -> Result<Snapshot> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save(&self, snapshot: &Snapshot) -> Result<()> {
            if self.stall_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            tokio::task::yield_now().await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(VtnError::StorageFailure("disk full".into()));
            }
            *self.saved.lock().unwrap() = snapshot.clone();
            Ok(())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn flaky_registry() -> (Arc<FlakyStore>, FleetRegistry) {
        let store = Arc::new(FlakyStore::default());
        let registry = FleetRegistry::open(store.clone(), RegistrySettings::default())
            .await
            .unwrap();
        (store, registry)
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let (_, registry) = flaky_registry().await;
        registry.register("ven_1").await.unwrap();
        let err = registry.register("ven_1").await.unwrap_err();
        assert!(matches!(err, VtnError::DuplicateResource(name) if name == "ven_1"));
    }

    #[tokio::test]
    async fn known_names_track_register_and_remove() {
        let (_, registry) = flaky_registry().await;
        for name in ["a", "b", "c"] {
            registry.register(name).await.unwrap();
        }
        registry.remove("b").await.unwrap();
        registry.register("d").await.unwrap();
        registry.remove("a").await.unwrap();

        let names: Vec<String> = registry.list_all().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert!(matches!(
            registry.remove("a").await,
            Err(VtnError::UnknownResource(_))
        ));
    }

    #[tokio::test]
    async fn lookups_by_name_and_id_agree() {
        let (_, registry) = flaky_registry().await;
        let record = registry.register("ven_1").await.unwrap();

        assert_eq!(registry.lookup_by_name("ven_1").await.unwrap(), record);
        assert_eq!(registry.lookup_by_id(&record.resource_id).await.unwrap(), record);
        assert_eq!(registry.resolve(&record.resource_id).await.unwrap(), record);
        assert!(matches!(
            registry.lookup_by_id("missing").await,
            Err(VtnError::UnknownResource(_))
        ));
    }

    #[tokio::test]
    async fn report_for_unknown_resource_fails() {
        let (_, registry) = flaky_registry().await;
        let err = registry.record_report("ghost", 1.0, "voltage", at(0)).await;
        assert!(matches!(err, Err(VtnError::UnknownResource(_))));
    }

    #[tokio::test]
    async fn history_is_capped_after_many_reports() {
        let (_, registry) = flaky_registry().await;
        registry.register("ven_1").await.unwrap();
        for s in 0..=CHECK_IN_CAPACITY as i64 {
            registry.record_report("ven_1", s as f64, "voltage", at(s * 10)).await.unwrap();
        }

        let record = registry.lookup_by_name("ven_1").await.unwrap();
        assert_eq!(record.check_in_history.len(), CHECK_IN_CAPACITY);
        assert_eq!(record.check_in_history.iter().next(), Some(&at(10)));
        assert_eq!(registry.connection_quality("ven_1").await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn failed_registration_is_rolled_back() {
        let (store, registry) = flaky_registry().await;
        store.fail.store(true, Ordering::SeqCst);

        let err = registry.register("ven_1").await.unwrap_err();
        assert!(matches!(err, VtnError::StorageFailure(_)));
        assert!(registry.list_all().await.is_empty());

        store.fail.store(false, Ordering::SeqCst);
        assert!(registry.register("ven_1").await.is_ok());
    }

    #[tokio::test]
    async fn failed_report_restores_previous_telemetry() {
        let (store, registry) = flaky_registry().await;
        registry.register("ven_1").await.unwrap();
        registry.record_report("ven_1", 120.0, "voltage", at(0)).await.unwrap();

        store.fail.store(true, Ordering::SeqCst);
        assert!(registry.record_report("ven_1", 99.0, "voltage", at(10)).await.is_err());

        let record = registry.lookup_by_name("ven_1").await.unwrap();
        assert_eq!(record.last_report_value, Some(120.0));
        assert_eq!(record.check_in_history.len(), 1);
        assert_eq!(store.saved.lock().unwrap().get("ven_1"), Some(&record));
    }

    #[tokio::test]
    async fn failed_removal_keeps_the_record() {
        let (store, registry) = flaky_registry().await;
        registry.register("ven_1").await.unwrap();
        store.fail.store(true, Ordering::SeqCst);

        assert!(registry.remove("ven_1").await.is_err());
        assert!(registry.lookup_by_name("ven_1").await.is_ok());
    }

    #[tokio::test]
    async fn timed_out_save_does_not_survive_rollback() {
        let store = Arc::new(FlakyStore::default());
        let settings = RegistrySettings {
            io_timeout: Duration::from_millis(20),
            ..RegistrySettings::default()
        };
        let registry = FleetRegistry::open(store.clone(), settings).await.unwrap();
        store.stall_next.store(true, Ordering::SeqCst);

        let err = registry.register("ven_1").await.unwrap_err();
        assert!(matches!(err, VtnError::StorageFailure(_)));
        assert!(registry.list_all().await.is_empty());

        // the stalled write has landed by now and been overwritten
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(store.saved.lock().unwrap().is_empty());

        let reopened = FleetRegistry::open(store.clone(), settings).await.unwrap();
        assert!(reopened.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_register_and_report_are_serialized() {
        let (store, registry) = flaky_registry().await;

        let (registered, reported) = tokio::join!(
            registry.register("ven_1"),
            registry.record_report("ven_1", 120.0, "voltage", at(0)),
        );
        registered.unwrap();
        reported.unwrap();

        let record = registry.lookup_by_name("ven_1").await.unwrap();
        assert_eq!(record.last_report_value, Some(120.0));
        assert_eq!(record.check_in_history.len(), 1);
        assert_eq!(store.saved.lock().unwrap().get("ven_1"), Some(&record));
    }

    #[tokio::test]
    async fn registry_reloads_from_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn RegistryStore> = Arc::new(JsonFileStore::new(dir.path()));

        let registry = FleetRegistry::open(store.clone(), RegistrySettings::default())
            .await
            .unwrap();
        registry.register("ven_1").await.unwrap();
        registry.register("ven_2").await.unwrap();
        registry.record_report("ven_2", 7.5, "power", at(0)).await.unwrap();
        registry.close().await.unwrap();
        let before = registry.list_all().await;

        let reopened = FleetRegistry::open(store, RegistrySettings::default())
            .await
            .unwrap();
        assert_eq!(reopened.list_all().await, before);
    }
}
