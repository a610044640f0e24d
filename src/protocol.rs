//! Inbound callbacks invoked by the protocol engine.
//!
//! The VEN has already sent the notification by the time one of these
//! runs, so failures are logged and swallowed rather than returned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::dr::{Event, OptType};
use crate::vtn::Vtn;

/// Hooks the protocol engine calls as VEN traffic arrives.
#[async_trait]
pub trait VenCallbacks: Send + Sync {
    /// A VEN asks to register. Returns `(ven_id, registration_id)` for a
    /// pre-registered name, `None` to reject it.
    async fn on_register(&self, ven_name: &str) -> Option<(String, String)>;

    /// A VEN cancels its own registration.
    async fn on_cancel_registration(&self, ven_id: &str);

    /// A VEN delivers report readings for one measurement.
    async fn on_report(&self, ven_id: &str, measurement: &str, readings: &[(DateTime<Utc>, f64)]);

    /// A VEN answers an event.
    async fn on_event_response(&self, ven_id: &str, event_id: &str, opt: OptType);

    /// A VEN polls for its events.
    async fn on_request_event(&self, ven_id: &str) -> Vec<Event>;
}

#[async_trait]
impl VenCallbacks for Vtn {
    async fn on_register(&self, ven_name: &str) -> Option<(String, String)> {
        match self.registry().lookup_by_name(ven_name).await {
            Ok(record) => Some((record.resource_id, record.registration_id)),
            Err(_) => {
                warn!(ven = ven_name, "an unknown VEN tried to connect");
                None
            }
        }
    }

    async fn on_cancel_registration(&self, ven_id: &str) {
        let record = match self.registry().lookup_by_id(ven_id).await {
            Ok(record) => record,
            Err(_) => {
                warn!(ven_id, "attempted to deregister unknown VEN");
                return;
            }
        };
        match self.registry().remove(&record.name).await {
            Ok(()) => info!(ven = %record.name, ven_id, "VEN deregistered"),
            Err(e) => warn!(ven = %record.name, ven_id, error = %e, "VEN deregistration failed"),
        }
    }

    async fn on_report(&self, ven_id: &str, measurement: &str, readings: &[(DateTime<Utc>, f64)]) {
        let name = match self.registry().lookup_by_id(ven_id).await {
            Ok(record) => record.name,
            Err(_) => {
                warn!(ven_id, measurement, "report from unknown VEN ignored");
                return;
            }
        };

        for (at, value) in readings {
            info!(ven = %name, measurement, value, time = %at, "VEN reported");
            if let Err(e) = self
                .registry()
                .record_report(&name, *value, measurement, *at)
                .await
            {
                warn!(ven = %name, error = %e, "report not recorded");
            }
        }
    }

    async fn on_event_response(&self, ven_id: &str, event_id: &str, opt: OptType) {
        info!(ven_id, event_id, response = %opt, "VEN responded to event");
        if !self.coordinator().record_response(ven_id, event_id, opt).await {
            warn!(ven_id, event_id, "response for unknown or cancelled event ignored");
        }
    }

    async fn on_request_event(&self, ven_id: &str) -> Vec<Event> {
        self.coordinator().list_events(ven_id).await
    }
}
