//! Demand-response VTN: VEN fleet registry and event coordination.

#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
/// Demand-response signals, dispatch and event coordination.
pub mod dr;
pub mod error;
/// VEN fleet registry and persistence.
pub mod fleet;
pub mod io;
pub mod protocol;
pub mod vtn;

pub use error::{Result, VtnError};
