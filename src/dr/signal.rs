//! Event signal vocabulary and interval definitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VtnError;

/// Supported signal names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalName {
    Simple,
    ElectricityPrice,
    LoadDispatch,
}

impl SignalName {
    /// Wire spelling of the signal name.
    pub fn as_str(self) -> &'static str {
        match self {
            SignalName::Simple => "SIMPLE",
            SignalName::ElectricityPrice => "ELECTRICITY_PRICE",
            SignalName::LoadDispatch => "LOAD_DISPATCH",
        }
    }

    /// Request field that carries this signal's payload.
    pub fn payload_field(self) -> &'static str {
        match self {
            SignalName::Simple => "level",
            SignalName::ElectricityPrice => "price",
            SignalName::LoadDispatch => "setpoint",
        }
    }

    /// Picks the payload carried in this signal's request field.
    ///
    /// `SIMPLE` falls back to level 1 when no level is given; the other
    /// signals require their field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` naming the missing field.
    pub fn select_payload(
        self,
        level: Option<f64>,
        price: Option<f64>,
        setpoint: Option<f64>,
    ) -> Result<f64, VtnError> {
        let value = match self {
            SignalName::Simple => Some(level.unwrap_or(1.0)),
            SignalName::ElectricityPrice => price,
            SignalName::LoadDispatch => setpoint,
        };
        value.ok_or_else(|| {
            VtnError::InvalidRequest(format!("missing {} for {self} event", self.payload_field()))
        })
    }
}

impl FromStr for SignalName {
    type Err = VtnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIMPLE" => Ok(SignalName::Simple),
            "ELECTRICITY_PRICE" => Ok(SignalName::ElectricityPrice),
            "LOAD_DISPATCH" => Ok(SignalName::LoadDispatch),
            other => Err(VtnError::InvalidSignal(format!("unknown signal name {other}"))),
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported signal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalType {
    Level,
    Price,
    PriceRelative,
    PriceMultiplier,
    Setpoint,
    Delta,
    Multiplier,
}

impl SignalType {
    /// Wire spelling of the signal type.
    pub fn as_str(self) -> &'static str {
        match self {
            SignalType::Level => "level",
            SignalType::Price => "price",
            SignalType::PriceRelative => "priceRelative",
            SignalType::PriceMultiplier => "priceMultiplier",
            SignalType::Setpoint => "setpoint",
            SignalType::Delta => "delta",
            SignalType::Multiplier => "multiplier",
        }
    }
}

impl FromStr for SignalType {
    type Err = VtnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level" => Ok(SignalType::Level),
            "price" => Ok(SignalType::Price),
            "priceRelative" => Ok(SignalType::PriceRelative),
            "priceMultiplier" => Ok(SignalType::PriceMultiplier),
            "setpoint" => Ok(SignalType::Setpoint),
            "delta" => Ok(SignalType::Delta),
            "multiplier" => Ok(SignalType::Multiplier),
            other => Err(VtnError::InvalidSignal(format!("unknown signal type {other}"))),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active period of a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Start of the interval (inclusive).
    pub start_time: DateTime<Utc>,
    /// Length of the interval.
    pub duration: TimeDelta,
    /// Signal value while the interval is active.
    pub payload: f64,
}

impl Interval {
    pub fn new(start_time: DateTime<Utc>, duration: TimeDelta, payload: f64) -> Self {
        Self {
            start_time,
            duration,
            payload,
        }
    }

    /// End of the interval (exclusive).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration
    }
}

/// Signal content of an event. Two events carrying equal signals are duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: SignalName,
    pub kind: SignalType,
    pub intervals: Vec<Interval>,
}

impl Signal {
    /// Parses name and type against the supported enumerations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignal` if either string is not recognized.
    pub fn parse(name: &str, kind: &str, intervals: Vec<Interval>) -> Result<Self, VtnError> {
        Ok(Self {
            name: name.parse()?,
            kind: kind.parse()?,
            intervals,
        })
    }
}
