//! API request and response types.
//!
//! Request fields also accept the camelCase spellings used by the web
//! console (`venName`, `signalName`, ...).

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::dr::OptType;
use crate::error::VtnError;
use crate::fleet::ResourceStatus;
use crate::vtn::EventListing;

/// Console start-time format, interpreted as UTC.
const CONSOLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Body of `POST /api/ven` and `POST /api/remove_ven`.
#[derive(Debug, Deserialize)]
pub struct VenNameRequest {
    #[serde(alias = "venName")]
    pub name: Option<String>,
}

impl VenNameRequest {
    /// The trimmed, non-empty VEN name.
    pub fn require_name(&self) -> Result<&str, VtnError> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| VtnError::InvalidRequest("missing venName".into()))
    }
}

/// Reply to a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterVenResponse {
    pub message: String,
    pub resource_id: String,
    pub registration_id: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// One row of `GET /api/list_vens`.
///
/// Field names match the console's table columns:
/// - `name` → `ven_name`
/// - `resource_id` → `ven_id`
/// - `last_report_value` → `last_report`
#[derive(Debug, Serialize)]
pub struct VenSummary {
    pub ven_name: String,
    pub ven_id: String,
    pub registration_id: String,
    pub last_report: Option<f64>,
    pub last_report_units: Option<String>,
    pub last_report_time: Option<DateTime<Utc>>,
    /// Check-in regularity score in `[0, 100]`.
    pub connection_quality: f64,
}

impl From<&ResourceStatus> for VenSummary {
    fn from(s: &ResourceStatus) -> Self {
        let r = &s.record;
        Self {
            ven_name: r.name.clone(),
            ven_id: r.resource_id.clone(),
            registration_id: r.registration_id.clone(),
            last_report: r.last_report_value,
            last_report_units: r.last_report_units.clone(),
            last_report_time: r.last_report_time,
            connection_quality: s.connection_quality,
        }
    }
}

/// Body of `POST /api/event`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateEventRequest {
    /// VEN name or resource id.
    #[serde(alias = "venName", alias = "ven_id", alias = "resource_id")]
    pub resource: Option<String>,
    #[serde(alias = "signalName")]
    pub signal_name: Option<String>,
    #[serde(alias = "signalType")]
    pub signal_type: Option<String>,
    /// `YYYY-MM-DDTHH:MM` (UTC) or RFC 3339.
    #[serde(alias = "startTime")]
    pub start_time: Option<String>,
    /// Whole minutes, as a number or a numeric string.
    #[serde(alias = "duration")]
    pub duration_minutes: Option<MinutesField>,
    /// Payload for `SIMPLE` events.
    pub level: Option<f64>,
    /// Payload for `ELECTRICITY_PRICE` events.
    pub price: Option<f64>,
    /// Payload for `LOAD_DISPATCH` events.
    pub setpoint: Option<f64>,
}

/// Event duration as sent by API clients: the console posts form input
/// values as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MinutesField {
    Number(i64),
    Text(String),
}

impl MinutesField {
    /// The minute count, parsing the text form.
    pub fn minutes(&self) -> Result<i64, VtnError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| VtnError::InvalidRequest(format!("invalid duration \"{s}\""))),
        }
    }
}

/// Reply to a successful event creation.
#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub message: String,
    pub event_id: String,
}

/// Body of `POST /api/cancel_event`.
#[derive(Debug, Deserialize)]
pub struct CancelEventRequest {
    #[serde(alias = "ven_id")]
    pub resource_id: Option<String>,
    pub event_id: Option<String>,
}

/// One event joined with its VEN, as listed by the event endpoints.
#[derive(Debug, Serialize)]
pub struct EventRow {
    pub resource_id: String,
    pub resource_name: String,
    pub event_id: String,
    pub signal_name: String,
    pub signal_type: String,
    pub event_start: DateTime<Utc>,
    pub event_duration_minutes: f64,
    pub payload: f64,
    /// VEN reply, if one has arrived.
    pub response: Option<OptType>,
}

impl From<&EventListing> for EventRow {
    fn from(l: &EventListing) -> Self {
        let e = &l.event;
        let first = e.signal.intervals.first();
        Self {
            resource_id: e.target_resource_id.clone(),
            resource_name: l.resource_name.clone(),
            event_id: e.event_id.clone(),
            signal_name: e.signal.name.to_string(),
            signal_type: e.signal.kind.to_string(),
            event_start: first.map_or(DateTime::<Utc>::MIN_UTC, |i| i.start_time),
            event_duration_minutes: first
                .map_or(0.0, |i| i.duration.num_seconds() as f64 / 60.0),
            payload: first.map_or(0.0, |i| i.payload),
            response: e.response,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Parses a console or RFC 3339 start time.
pub fn parse_start_time(s: &str) -> Result<DateTime<Utc>, VtnError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, CONSOLE_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| VtnError::InvalidRequest(format!("invalid startTime \"{s}\"")))
}

/// Converts a positive minute count into a duration.
pub fn parse_duration_minutes(minutes: i64) -> Result<TimeDelta, VtnError> {
    if minutes <= 0 {
        return Err(VtnError::InvalidRequest(format!(
            "duration must be a positive number of minutes, got {minutes}"
        )));
    }
    TimeDelta::try_minutes(minutes)
        .ok_or_else(|| VtnError::InvalidRequest(format!("duration {minutes} is out of range")))
}
