//! Outbound seam to the protocol engine that delivers events to VENs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::signal::Signal;
use crate::error::Result;

/// Delivers and cancels events on behalf of the coordinator.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Hands `signal` to the protocol engine for `resource_id` and returns
    /// the id it assigned to the new event.
    async fn dispatch_event(&self, resource_id: &str, signal: &Signal) -> Result<String>;

    /// Withdraws a previously dispatched event.
    async fn cancel_event(&self, resource_id: &str, event_id: &str) -> Result<()>;
}

/// Event waiting in a [`LoopbackDispatcher`] outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub event_id: String,
    pub signal: Signal,
}

/// In-process dispatcher holding a per-VEN outbox.
///
/// Assigns UUID event ids. The protocol engine enumerates or drains the
/// outbox when a VEN polls. Cancelling removes the event if it has not
/// been drained yet.
#[derive(Debug, Default)]
pub struct LoopbackDispatcher {
    outbox: Mutex<HashMap<String, Vec<OutboundEvent>>>,
}

impl LoopbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events currently queued for `resource_id`.
    pub async fn pending(&self, resource_id: &str) -> Vec<OutboundEvent> {
        self.outbox
            .lock()
            .await
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes and returns the events queued for `resource_id`.
    pub async fn drain(&self, resource_id: &str) -> Vec<OutboundEvent> {
        self.outbox
            .lock()
            .await
            .remove(resource_id)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Dispatcher for LoopbackDispatcher {
    async fn dispatch_event(&self, resource_id: &str, signal: &Signal) -> Result<String> {
        let event_id = Uuid::new_v4().to_string();
        self.outbox
            .lock()
            .await
            .entry(resource_id.to_string())
            .or_default()
            .push(OutboundEvent {
                event_id: event_id.clone(),
                signal: signal.clone(),
            });
        debug!(ven_id = resource_id, %event_id, "event queued");
        Ok(event_id)
    }

    async fn cancel_event(&self, resource_id: &str, event_id: &str) -> Result<()> {
        if let Some(queue) = self.outbox.lock().await.get_mut(resource_id) {
            queue.retain(|e| e.event_id != event_id);
        }
        debug!(ven_id = resource_id, event_id, "event withdrawn");
        Ok(())
    }
}
