//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use vtn_fleet::dr::{EventCoordinator, Interval, LoopbackDispatcher};
use vtn_fleet::fleet::{FleetRegistry, JsonFileStore, RegistrySettings};
use vtn_fleet::vtn::{EventRequest, Vtn};

/// Registry settings with the default 10 s check-in interval and short I/O timeout.
pub fn default_settings() -> RegistrySettings {
    RegistrySettings {
        expected_check_in: Duration::from_secs(10),
        io_timeout: Duration::from_secs(2),
    }
}

/// Opens a JSON-backed registry rooted at `dir`.
pub async fn open_registry(dir: &Path) -> FleetRegistry {
    FleetRegistry::open(Arc::new(JsonFileStore::new(dir)), default_settings())
        .await
        .expect("registry should open")
}

/// Full VTN over a JSON registry at `dir` and a loopback dispatcher.
///
/// Returns `(vtn, dispatcher)` so tests can inspect the outbox.
pub async fn build_vtn(dir: &Path) -> (Arc<Vtn>, Arc<LoopbackDispatcher>) {
    let registry = open_registry(dir).await;
    let dispatcher = Arc::new(LoopbackDispatcher::new());
    let coordinator = EventCoordinator::new(dispatcher.clone(), Duration::from_secs(2));
    let vtn = Vtn::new("test_vtn", Arc::new(registry), Arc::new(coordinator));
    (Arc::new(vtn), dispatcher)
}

/// Fixed reference instant (2024-06-01 17:00 UTC).
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap()
}

/// `t0` shifted by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + TimeDelta::seconds(secs)
}

/// Single 30-minute interval starting at `start` with payload 1.
pub fn thirty_minutes_from(start: DateTime<Utc>) -> Vec<Interval> {
    vec![Interval::new(start, TimeDelta::minutes(30), 1.0)]
}

/// `SIMPLE`/`level` request for `resource` starting at `t0`.
pub fn simple_request(resource: &str) -> EventRequest {
    EventRequest {
        resource: resource.to_string(),
        signal_name: "SIMPLE".into(),
        signal_type: "level".into(),
        start_time: t0(),
        duration: TimeDelta::minutes(30),
        payload: 1.0,
    }
}
