//! Heartbeat failure detector.
//!
//! A [`net::WatchdogServer`] listens for `<key>\n` heartbeat lines over TCP.
//! When no valid heartbeat arrives for `attempts` consecutive timeout
//! windows, the [`monitor::DeadlineChecker`] runs the configured
//! [`escalation::EscalationAction`] (by default, the recovery scripts in a
//! directory). A [`net::HeartbeatClient`] sends the heartbeats.

#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
pub mod daemon;
pub mod escalation;
pub mod logger;
pub mod monitor;
pub mod net;

pub use crate::core::config::Config;
pub use crate::core::errors::{Result, WatchdogError};
