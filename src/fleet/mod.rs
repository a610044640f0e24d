//! Registered VEN fleet: identity, telemetry, liveness and persistence.

/// Resource records and check-in history.
pub mod record;
pub mod registry;
/// Durable registry storage.
pub mod store;

pub use record::{CheckInHistory, ResourceRecord, ResourceStatus};
pub use registry::{FleetRegistry, RegistrySettings};
pub use store::{JsonFileStore, RegistryStore};
