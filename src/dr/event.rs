//! Event types owned by the event coordinator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::signal::Signal;
use crate::error::VtnError;

/// A VEN's reply to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptType {
    OptIn,
    OptOut,
}

impl OptType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptType::OptIn => "optIn",
            OptType::OptOut => "optOut",
        }
    }
}

impl FromStr for OptType {
    type Err = VtnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optIn" => Ok(OptType::OptIn),
            "optOut" => Ok(OptType::OptOut),
            other => Err(VtnError::InvalidRequest(format!("unknown opt type {other}"))),
        }
    }
}

impl fmt::Display for OptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A control signal dispatched to one VEN.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Id assigned by the dispatcher; unique within the target's event list.
    pub event_id: String,
    /// VEN the event was dispatched to.
    pub target_resource_id: String,
    pub signal: Signal,
    /// Latest reply from the VEN, if any.
    pub response: Option<OptType>,
}

impl Event {
    /// Returns `true` when `other` carries the same signal content.
    pub fn is_duplicate_of(&self, other: &Signal) -> bool {
        self.signal == *other
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::dr::signal::Interval;

    #[test]
    fn opt_type_parses_wire_names() {
        assert_eq!("optIn".parse::<OptType>().unwrap(), OptType::OptIn);
        assert_eq!("optOut".parse::<OptType>().unwrap(), OptType::OptOut);
        assert!("maybe".parse::<OptType>().is_err());
    }

    #[test]
    fn duplicate_check_ignores_id_and_response() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap();
        let signal = Signal::parse(
            "LOAD_DISPATCH",
            "setpoint",
            vec![Interval::new(t0, TimeDelta::minutes(15), 2.5)],
        )
        .unwrap();
        let event = Event {
            event_id: "e1".into(),
            target_resource_id: "r1".into(),
            signal: signal.clone(),
            response: Some(OptType::OptOut),
        };

        assert!(event.is_duplicate_of(&signal));
        let mut other = signal;
        other.intervals[0].payload = 2.0;
        assert!(!event.is_duplicate_of(&other));
    }
}
