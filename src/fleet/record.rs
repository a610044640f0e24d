//! Per-VEN identity, telemetry and liveness records.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of check-in timestamps retained per resource.
pub const CHECK_IN_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of recent check-in timestamps, oldest first.
///
/// Serializes as a plain list of RFC 3339 strings, most-recent-last.
/// Lists longer than [`CHECK_IN_CAPACITY`] are truncated to their tail
/// when loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DateTime<Utc>>", into = "Vec<DateTime<Utc>>")]
pub struct CheckInHistory {
    stamps: VecDeque<DateTime<Utc>>,
}

impl CheckInHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self {
            stamps: VecDeque::with_capacity(CHECK_IN_CAPACITY),
        }
    }

    /// Appends a check-in, evicting the oldest entry once at capacity.
    pub fn push(&mut self, at: DateTime<Utc>) {
        if self.stamps.len() == CHECK_IN_CAPACITY {
            self.stamps.pop_front();
        }
        self.stamps.push_back(at);
    }

    /// Number of retained check-ins.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Returns `true` when no check-in has been recorded.
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Iterates timestamps oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.stamps.iter()
    }

    /// Scores check-in regularity on a 0–100 scale.
    ///
    /// A gap between successive check-ins is valid when it does not
    /// exceed twice `expected`. The score is the share of valid gaps.
    /// Fewer than two check-ins yield `0.0`.
    ///
    /// # Arguments
    ///
    /// * `expected` - Nominal interval between check-ins
    pub fn connection_quality(&self, expected: Duration) -> f64 {
        if self.stamps.len() < 2 {
            return 0.0;
        }

        let threshold_ms = i64::try_from(expected.saturating_mul(2).as_millis()).unwrap_or(i64::MAX);
        let gaps = self.stamps.len() - 1;
        let valid = self
            .stamps
            .iter()
            .zip(self.stamps.iter().skip(1))
            .filter(|(prev, next)| (**next - **prev).num_milliseconds() <= threshold_ms)
            .count();

        100.0 * valid as f64 / gaps as f64
    }
}

impl From<Vec<DateTime<Utc>>> for CheckInHistory {
    fn from(mut stamps: Vec<DateTime<Utc>>) -> Self {
        if stamps.len() > CHECK_IN_CAPACITY {
            stamps.drain(..stamps.len() - CHECK_IN_CAPACITY);
        }
        Self {
            stamps: stamps.into(),
        }
    }
}

impl From<CheckInHistory> for Vec<DateTime<Utc>> {
    fn from(history: CheckInHistory) -> Self {
        history.stamps.into()
    }
}

/// Registered VEN: identity, last telemetry and liveness history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Unique name chosen by the registering party.
    pub name: String,
    /// Identifier handed to the VEN on registration.
    pub resource_id: String,
    /// Registration identifier handed to the VEN on registration.
    pub registration_id: String,
    /// Last reported value.
    #[serde(default)]
    pub last_report_value: Option<f64>,
    /// Measurement name of the last report.
    #[serde(default)]
    pub last_report_units: Option<String>,
    /// Timestamp carried by the last report.
    #[serde(default)]
    pub last_report_time: Option<DateTime<Utc>>,
    /// Recent check-ins used for connection quality.
    #[serde(default)]
    pub check_in_history: CheckInHistory,
}

impl ResourceRecord {
    /// Creates a record with fresh random identifiers and no telemetry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_id: Uuid::new_v4().to_string(),
            registration_id: Uuid::new_v4().to_string(),
            last_report_value: None,
            last_report_units: None,
            last_report_time: None,
            check_in_history: CheckInHistory::new(),
        }
    }

    /// Overwrites the last report and counts it as a check-in.
    pub fn apply_report(&mut self, value: f64, units: impl Into<String>, at: DateTime<Utc>) {
        self.last_report_value = Some(value);
        self.last_report_units = Some(units.into());
        self.last_report_time = Some(at);
        self.check_in_history.push(at);
    }
}

/// A record annotated with its current connection quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStatus {
    #[serde(flatten)]
    pub record: ResourceRecord,
    /// Check-in regularity score in `[0, 100]`.
    pub connection_quality: f64,
}
