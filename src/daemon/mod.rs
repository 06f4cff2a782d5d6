//! Daemon subsystem: long-running server/client entry points and signal
//! handling.

pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;

pub use loop_main::{run_client, run_server};
