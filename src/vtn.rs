//! Administrative operations composing the fleet registry and event coordinator.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use crate::dr::{Event, EventCoordinator, Interval};
use crate::error::Result;
use crate::fleet::{FleetRegistry, ResourceRecord, ResourceStatus};

/// Display name used for events whose VEN is no longer registered.
pub const UNKNOWN_RESOURCE_LABEL: &str = "Unknown VEN";

/// A request to dispatch a single-interval event to one VEN.
#[derive(Debug, Clone)]
pub struct EventRequest {
    /// VEN name or resource id.
    pub resource: String,
    pub signal_name: String,
    pub signal_type: String,
    pub start_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub payload: f64,
}

/// Outcome of a successful [`Vtn::schedule_event`].
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub event_id: String,
    pub resource: ResourceRecord,
}

/// An event joined with the current name of its VEN.
#[derive(Debug, Clone)]
pub struct EventListing {
    pub resource_name: String,
    pub event: Event,
}

/// The VTN: registry and coordinator wired together.
///
/// Constructed once at startup and shared by the API and the protocol
/// callbacks.
pub struct Vtn {
    vtn_id: String,
    registry: Arc<FleetRegistry>,
    coordinator: Arc<EventCoordinator>,
}

impl Vtn {
    pub fn new(
        vtn_id: impl Into<String>,
        registry: Arc<FleetRegistry>,
        coordinator: Arc<EventCoordinator>,
    ) -> Self {
        Self {
            vtn_id: vtn_id.into(),
            registry,
            coordinator,
        }
    }

    pub fn vtn_id(&self) -> &str {
        &self.vtn_id
    }

    pub fn registry(&self) -> &FleetRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    /// Registers a VEN by name.
    pub async fn register_resource(&self, name: &str) -> Result<ResourceRecord> {
        self.registry.register(name).await
    }

    /// Removes a VEN by name. Its events are kept.
    pub async fn remove_resource(&self, name: &str) -> Result<()> {
        self.registry.remove(name).await
    }

    /// All VENs with their connection quality.
    pub async fn list_resources(&self) -> Vec<ResourceStatus> {
        self.registry.list_all_with_quality().await
    }

    /// Resolves the target VEN and creates the requested event.
    ///
    /// # Errors
    ///
    /// `UnknownResource` when neither a name nor an id matches, otherwise
    /// whatever [`EventCoordinator::create_event`] returns.
    pub async fn schedule_event(&self, request: EventRequest) -> Result<ScheduledEvent> {
        let resource = self.registry.resolve(&request.resource).await?;
        let intervals = vec![Interval::new(
            request.start_time,
            request.duration,
            request.payload,
        )];
        let event_id = self
            .coordinator
            .create_event(
                &resource.resource_id,
                &request.signal_name,
                &request.signal_type,
                intervals,
            )
            .await?;

        info!(
            ven = %resource.name,
            %event_id,
            signal = %request.signal_name,
            "event sent"
        );
        Ok(ScheduledEvent { event_id, resource })
    }

    /// Cancels one event, returning it with its VEN's display name.
    pub async fn cancel_event(&self, resource_id: &str, event_id: &str) -> Result<EventListing> {
        let event = self.coordinator.cancel_event(resource_id, event_id).await?;
        let resource_name = self.display_name(resource_id).await;
        Ok(EventListing {
            resource_name,
            event,
        })
    }

    /// Every event joined with its VEN's current name, grouped by resource id.
    pub async fn event_listing(&self) -> Vec<EventListing> {
        let mut rows = Vec::new();
        for (resource_id, events) in self.coordinator.list_all_events().await {
            let resource_name = self.display_name(&resource_id).await;
            rows.extend(events.into_iter().map(|event| EventListing {
                resource_name: resource_name.clone(),
                event,
            }));
        }
        rows
    }

    /// Events held for one VEN, addressed by name or id.
    pub async fn events_for(&self, resource: &str) -> Result<(ResourceRecord, Vec<Event>)> {
        let record = self.registry.resolve(resource).await?;
        let events = self.coordinator.list_events(&record.resource_id).await;
        Ok((record, events))
    }

    async fn display_name(&self, resource_id: &str) -> String {
        self.registry
            .lookup_by_id(resource_id)
            .await
            .map(|r| r.name)
            .unwrap_or_else(|_| UNKNOWN_RESOURCE_LABEL.to_string())
    }
}
