//! Event coordinator: owns every VEN's event list.
//!
//! Each VEN's list sits behind its own lock, held from the duplicate check
//! through dispatch to the append. Identical requests racing against the
//! same VEN therefore create at most one event, and an event is recorded
//! only after the dispatcher has accepted it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;
use super::event::{Event, OptType};
use super::signal::{Interval, Signal};
use crate::error::{Result, VtnError};

type EventList = Arc<Mutex<Vec<Event>>>;

/// Active events per VEN, created and cancelled through a [`Dispatcher`].
pub struct EventCoordinator {
    dispatcher: Arc<dyn Dispatcher>,
    lists: Mutex<HashMap<String, EventList>>,
    dispatch_timeout: Duration,
}

impl EventCoordinator {
    /// Creates a coordinator with no events.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - Protocol engine seam used to deliver and cancel events
    /// * `dispatch_timeout` - Upper bound on a single dispatcher call
    pub fn new(dispatcher: Arc<dyn Dispatcher>, dispatch_timeout: Duration) -> Self {
        Self {
            dispatcher,
            lists: Mutex::new(HashMap::new()),
            dispatch_timeout,
        }
    }

    /// Validates and dispatches a new event to `resource_id`.
    ///
    /// # Errors
    ///
    /// * `InvalidSignal` - unknown signal name or type; nothing is dispatched
    /// * `DuplicateEvent` - an event with the same signal content is active
    /// * `DispatchFailure` - the dispatcher failed or timed out
    pub async fn create_event(
        &self,
        resource_id: &str,
        signal_name: &str,
        signal_type: &str,
        intervals: Vec<Interval>,
    ) -> Result<String> {
        let signal = Signal::parse(signal_name, signal_type, intervals)?;
        self.create_signal_event(resource_id, signal).await
    }

    /// Same as [`create_event`](Self::create_event) for an already parsed signal.
    pub async fn create_signal_event(&self, resource_id: &str, signal: Signal) -> Result<String> {
        let list = self.list_for(resource_id).await;
        let mut events = list.lock().await;

        if events.iter().any(|e| e.is_duplicate_of(&signal)) {
            info!(ven_id = resource_id, signal = %signal.name, "duplicate event rejected");
            return Err(VtnError::DuplicateEvent(resource_id.to_string()));
        }

        let event_id = self
            .bounded(self.dispatcher.dispatch_event(resource_id, &signal))
            .await
            .inspect_err(|e| warn!(ven_id = resource_id, error = %e, "event dispatch failed"))?;

        info!(
            ven_id = resource_id,
            %event_id,
            signal = %signal.name,
            kind = %signal.kind,
            "event dispatched"
        );
        events.push(Event {
            event_id: event_id.clone(),
            target_resource_id: resource_id.to_string(),
            signal,
            response: None,
        });
        Ok(event_id)
    }

    /// Cancels an event and drops it from the VEN's list.
    ///
    /// # Errors
    ///
    /// * `UnknownEvent` - no such event in the VEN's list
    /// * `DispatchFailure` - the dispatcher failed; the event is kept
    pub async fn cancel_event(&self, resource_id: &str, event_id: &str) -> Result<Event> {
        let unknown = || VtnError::UnknownEvent {
            resource_id: resource_id.to_string(),
            event_id: event_id.to_string(),
        };

        let list = self.existing_list(resource_id).await.ok_or_else(unknown)?;
        let mut events = list.lock().await;
        let index = events
            .iter()
            .position(|e| e.event_id == event_id)
            .ok_or_else(unknown)?;

        self.bounded(self.dispatcher.cancel_event(resource_id, event_id))
            .await
            .inspect_err(|e| warn!(ven_id = resource_id, event_id, error = %e, "event cancel failed"))?;

        info!(ven_id = resource_id, event_id, "event cancelled");
        Ok(events.remove(index))
    }

    /// Events currently held for `resource_id`, oldest first.
    pub async fn list_events(&self, resource_id: &str) -> Vec<Event> {
        match self.existing_list(resource_id).await {
            Some(list) => list.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Every VEN's events keyed by resource id. VENs without events are omitted.
    pub async fn list_all_events(&self) -> BTreeMap<String, Vec<Event>> {
        let lists: Vec<(String, EventList)> = self
            .lists
            .lock()
            .await
            .iter()
            .map(|(id, list)| (id.clone(), Arc::clone(list)))
            .collect();

        let mut all = BTreeMap::new();
        for (id, list) in lists {
            let events = list.lock().await.clone();
            if !events.is_empty() {
                all.insert(id, events);
            }
        }
        all
    }

    /// Stores a VEN's reply to one of its events.
    ///
    /// Replies for unknown or cancelled events are ignored. Returns `true`
    /// when an event was updated.
    pub async fn record_response(&self, resource_id: &str, event_id: &str, opt: OptType) -> bool {
        let Some(list) = self.existing_list(resource_id).await else {
            debug!(ven_id = resource_id, event_id, "response for VEN without events");
            return false;
        };

        let mut events = list.lock().await;
        match events.iter_mut().find(|e| e.event_id == event_id) {
            Some(event) => {
                event.response = Some(opt);
                info!(ven_id = resource_id, event_id, response = %opt, "event response recorded");
                true
            }
            None => {
                debug!(ven_id = resource_id, event_id, "response for unknown event ignored");
                false
            }
        }
    }

    async fn list_for(&self, resource_id: &str) -> EventList {
        Arc::clone(
            self.lists
                .lock()
                .await
                .entry(resource_id.to_string())
                .or_default(),
        )
    }

    async fn existing_list(&self, resource_id: &str) -> Option<EventList> {
        self.lists.lock().await.get(resource_id).cloned()
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.dispatch_timeout;
        tokio::time::timeout(limit, op).await.map_err(|_| {
            VtnError::DispatchFailure(format!("dispatcher did not answer within {limit:?}"))
        })?
    }
}
