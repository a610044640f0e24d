//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{error, info, warn};

use super::types::{
    CancelEventRequest, CreateEventRequest, CreateEventResponse, ErrorResponse, EventRow,
    MessageResponse, RegisterVenResponse, VenNameRequest, VenSummary, parse_duration_minutes,
    parse_start_time,
};
use crate::dr::SignalName;
use crate::error::VtnError;
use crate::vtn::{EventListing, EventRequest, Vtn};

/// Handler result: JSON body on success, status and error body otherwise.
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// JSON request body; unreadable bodies are rejected through [`error_response`].
type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn read_body<T>(body: JsonBody<T>) -> Result<T, (StatusCode, Json<ErrorResponse>)> {
    body.map(|Json(req)| req)
        .map_err(|rejection| error_response(VtnError::InvalidRequest(rejection.body_text())))
}

/// Maps a [`VtnError`] to its status code and error body.
///
/// Client-input errors become 400/404; storage and dispatch failures are
/// logged and surfaced as 5xx.
pub fn error_response(err: VtnError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        VtnError::UnknownResource(_) | VtnError::UnknownEvent { .. } => StatusCode::NOT_FOUND,
        VtnError::DuplicateResource(_)
        | VtnError::InvalidSignal(_)
        | VtnError::DuplicateEvent(_)
        | VtnError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        VtnError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        VtnError::DispatchFailure(_) => StatusCode::BAD_GATEWAY,
    };

    if err.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "request rejected");
    } else {
        error!(status = status.as_u16(), error = %err, "request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, VtnError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| VtnError::InvalidRequest(format!("missing {field}")))
}

/// Registers a VEN.
///
/// `POST /api/ven` → 200 + `RegisterVenResponse`
/// `POST /api/ven` (name taken) → 400 + `ErrorResponse`
pub async fn post_ven(
    State(vtn): State<Arc<Vtn>>,
    body: JsonBody<VenNameRequest>,
) -> ApiResult<RegisterVenResponse> {
    let req = read_body(body)?;
    let name = req.require_name().map_err(error_response)?;
    let record = vtn.register_resource(name).await.map_err(error_response)?;

    Ok(Json(RegisterVenResponse {
        message: format!("VEN {name} added successfully"),
        resource_id: record.resource_id,
        registration_id: record.registration_id,
    }))
}

/// Removes a VEN.
///
/// `POST /api/remove_ven` → 200, or 404 if the name is unknown.
pub async fn post_remove_ven(
    State(vtn): State<Arc<Vtn>>,
    body: JsonBody<VenNameRequest>,
) -> ApiResult<MessageResponse> {
    let req = read_body(body)?;
    let name = req.require_name().map_err(error_response)?;
    vtn.remove_resource(name).await.map_err(error_response)?;

    Ok(Json(MessageResponse {
        message: format!("VEN {name} removed successfully"),
    }))
}

/// Lists every VEN with its last report and connection quality.
///
/// `GET /api/list_vens` → 200 + `Vec<VenSummary>`
pub async fn get_list_vens(State(vtn): State<Arc<Vtn>>) -> Json<Vec<VenSummary>> {
    let vens = vtn.list_resources().await;
    Json(vens.iter().map(VenSummary::from).collect())
}

/// Creates an event for one VEN.
///
/// `POST /api/event` → 200 + `CreateEventResponse`
/// Unknown VEN → 404; bad signal, duplicate event or missing field → 400.
pub async fn post_event(
    State(vtn): State<Arc<Vtn>>,
    body: JsonBody<CreateEventRequest>,
) -> ApiResult<CreateEventResponse> {
    let req = read_body(body)?;
    let request = event_request(&req).map_err(error_response)?;
    let scheduled = vtn.schedule_event(request).await.map_err(error_response)?;

    Ok(Json(CreateEventResponse {
        message: format!("Event sent to {}", scheduled.resource.name),
        event_id: scheduled.event_id,
    }))
}

fn event_request(req: &CreateEventRequest) -> Result<EventRequest, VtnError> {
    let resource = required(&req.resource, "venName")?;
    let signal_name = required(&req.signal_name, "signalName")?;
    let signal_type = required(&req.signal_type, "signalType")?;
    let start_time = parse_start_time(required(&req.start_time, "startTime")?)?;
    let minutes = req
        .duration_minutes
        .as_ref()
        .ok_or_else(|| VtnError::InvalidRequest("missing duration".into()))?
        .minutes()?;
    let duration = parse_duration_minutes(minutes)?;
    let payload = signal_name
        .parse::<SignalName>()?
        .select_payload(req.level, req.price, req.setpoint)?;

    Ok(EventRequest {
        resource: resource.to_string(),
        signal_name: signal_name.to_string(),
        signal_type: signal_type.to_string(),
        start_time,
        duration,
        payload,
    })
}

/// Cancels one event.
///
/// `POST /api/cancel_event` → 200, or 404 if the event is unknown.
pub async fn post_cancel_event(
    State(vtn): State<Arc<Vtn>>,
    body: JsonBody<CancelEventRequest>,
) -> ApiResult<MessageResponse> {
    let req = read_body(body)?;
    let resource_id = required(&req.resource_id, "ven_id").map_err(error_response)?;
    let event_id = required(&req.event_id, "event_id").map_err(error_response)?;

    let cancelled = vtn
        .cancel_event(resource_id, event_id)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageResponse {
        message: format!(
            "Event '{}' cancelled for VEN '{}'",
            cancelled.event.signal.name, cancelled.resource_name
        ),
    }))
}

/// Lists every event joined with its VEN.
///
/// `GET /api/all_events` → 200 + `Vec<EventRow>`
pub async fn get_all_events(State(vtn): State<Arc<Vtn>>) -> Json<Vec<EventRow>> {
    let rows: Vec<EventRow> = vtn.event_listing().await.iter().map(EventRow::from).collect();
    info!(count = rows.len(), "events listed");
    Json(rows)
}

/// Lists the events of one VEN, addressed by name or id.
///
/// `GET /api/ven/{resource}/events` → 200 + `Vec<EventRow>`, or 404.
pub async fn get_ven_events(
    State(vtn): State<Arc<Vtn>>,
    Path(resource): Path<String>,
) -> ApiResult<Vec<EventRow>> {
    let (record, events) = vtn.events_for(&resource).await.map_err(error_response)?;
    let rows = events
        .into_iter()
        .map(|event| {
            EventRow::from(&EventListing {
                resource_name: record.name.clone(),
                event,
            })
        })
        .collect();
    Ok(Json(rows))
}
