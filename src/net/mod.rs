//! TCP heartbeat plumbing: line protocol, connection handler, accept loop,
//! client loop.

pub mod client;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::{BeatOutcome, ClientSettings, HeartbeatClient};
pub use handler::{HandlerOutcome, HeartbeatStream, handle_connection};
pub use server::{HeartbeatServer, ServerSettings, WatchdogServer};
