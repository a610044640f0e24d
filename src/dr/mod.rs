//! Demand-response event lifecycle: signals, dispatch and coordination.

pub mod coordinator;
/// Outbound dispatch seam and the in-process dispatcher.
pub mod dispatch;
pub mod event;
/// Signal names, types and intervals.
pub mod signal;

pub use coordinator::EventCoordinator;
pub use dispatch::{Dispatcher, LoopbackDispatcher};
pub use event::{Event, OptType};
pub use signal::{Interval, Signal, SignalName, SignalType};
