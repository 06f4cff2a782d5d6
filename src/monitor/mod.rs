//! Failure detection: monotonic clock, shared heartbeat state, periodic
//! deadline checker.

pub mod checker;
pub mod clock;
pub mod state;

pub use checker::DeadlineChecker;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use state::{HeartbeatRecord, HeartbeatState, TickVerdict};
