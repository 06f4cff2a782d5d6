//! Activity logging: console text + JSONL append-only with graceful degradation.
//!
//! Every loggable watchdog event is an [`ActivityEvent`]. The
//! [`ActivityLogger`] stamps it and fans it out to each configured
//! [`EventSink`]. A failing sink is reported once on stderr and skipped from
//! then on; logging never fails the caller.

#![allow(missing_docs)]

pub mod jsonl;

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::errors::Result;
use crate::monitor::state::TickVerdict;

pub use jsonl::JsonlSink;

/// Everything the watchdog reports about its own operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEvent {
    ServerListening { addr: String },
    ClientStarted { remote: String },
    HeartbeatReceived { peer: String },
    HeartbeatRejected { peer: String },
    ConnectionReadFailed { peer: String, error: String },
    ResponseWriteFailed { peer: String, error: String },
    AcceptFailed { error: String },
    HandlerSpawnFailed { peer: String, error: String },
    DeadlineCheck { verdict: TickVerdict, threshold: u32 },
    EscalationStarted { misses: u32 },
    RecoveryActionSucceeded { action: String },
    RecoveryActionFailed { action: String, error: String },
    EscalationFinished {
        ran: usize,
        failed: usize,
        last_error: Option<String>,
    },
    DialFailed { remote: String, error: String },
    HeartbeatWriteFailed { remote: String, error: String },
    ResponseReadFailed { remote: String, error: String },
    ServerAcknowledged { remote: String },
    ServerRejected { remote: String, response: String },
    SignalReceived { signal: i32 },
}

impl ActivityEvent {
    /// One-line human rendering used by the console sink.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ServerListening { addr } => format!("Server listening on {addr}"),
            Self::ClientStarted { remote } => format!("Sending heartbeats to {remote}"),
            Self::HeartbeatReceived { peer } => format!("Heartbeat received from {peer}"),
            Self::HeartbeatRejected { peer } => format!("Invalid key received from {peer}"),
            Self::ConnectionReadFailed { peer, error } => {
                format!("Error reading from connection {peer}: {error}")
            }
            Self::ResponseWriteFailed { peer, error } => {
                format!("Error writing response to {peer}: {error}")
            }
            Self::AcceptFailed { error } => format!("Error accepting connection: {error}"),
            Self::HandlerSpawnFailed { peer, error } => {
                format!("Cannot start handler for {peer}: {error}")
            }
            Self::DeadlineCheck { verdict, threshold } => match verdict {
                TickVerdict::Fresh { elapsed_ms } => {
                    format!("Heartbeat interval check ok - last heartbeat {elapsed_ms}ms ago")
                }
                TickVerdict::Missed { elapsed_ms, misses } => format!(
                    "Heartbeat timeout - failed attempt count: {misses}/{threshold} ({elapsed_ms}ms since last heartbeat)"
                ),
                TickVerdict::Escalate { elapsed_ms, misses } => format!(
                    "Heartbeat timeout - failed attempt count: {misses}/{threshold} ({elapsed_ms}ms since last heartbeat), escalating"
                ),
            },
            Self::EscalationStarted { misses } => {
                format!("Running recovery scripts after {misses} missed heartbeats")
            }
            Self::RecoveryActionSucceeded { action } => {
                format!("Successfully ran script: {action}")
            }
            Self::RecoveryActionFailed { action, error } => {
                format!("Error running script: {action} {error}")
            }
            Self::EscalationFinished {
                ran,
                failed,
                last_error,
            } => match last_error {
                Some(error) => {
                    format!("Escalation finished: {ran} ran, {failed} failed, last error: {error}")
                }
                None => format!("Escalation finished: {ran} ran, {failed} failed"),
            },
            Self::DialFailed { remote, error } => {
                format!("Error connecting to server {remote}: {error}")
            }
            Self::HeartbeatWriteFailed { remote, error } => {
                format!("Error writing to server {remote}: {error}")
            }
            Self::ResponseReadFailed { remote, error } => {
                format!("Error reading from server {remote}: {error}")
            }
            Self::ServerAcknowledged { .. } => "Server response: OK".to_string(),
            Self::ServerRejected { response, .. } => {
                format!("Server response: ERROR ({response:?})")
            }
            Self::SignalReceived { signal } => format!("Received signal {signal}"),
        }
    }
}

/// Timestamped event as written to sinks.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ActivityEvent,
}

/// Destination for activity entries.
pub trait EventSink: Send + Sync {
    /// Short sink name for degradation warnings.
    fn name(&self) -> &'static str;

    fn write(&self, entry: &LogEntry) -> std::io::Result<()>;
}

/// Plain text lines on stdout, `YYYY/MM/DD HH:MM:SS message`.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, entry: &LogEntry) -> std::io::Result<()> {
        let local: DateTime<Local> = entry.ts.into();
        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "{} {}",
            local.format("%Y/%m/%d %H:%M:%S"),
            entry.event.summary()
        )
    }
}

/// In-memory capture, shared with whoever holds a clone.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().clone()
    }

    /// Number of captured events matching `pred`.
    pub fn count(&self, pred: impl Fn(&ActivityEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| pred(event)).count()
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, entry: &LogEntry) -> std::io::Result<()> {
        self.events.lock().push(entry.event.clone());
        Ok(())
    }
}

struct SinkSlot {
    sink: Box<dyn EventSink>,
    degraded: AtomicBool,
}

/// Cheaply cloneable fan-out logger.
#[derive(Clone)]
pub struct ActivityLogger {
    sinks: Arc<Vec<SinkSlot>>,
}

impl std::fmt::Debug for ActivityLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLogger")
            .field(
                "sinks",
                &self.sinks.iter().map(|slot| slot.sink.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ActivityLogger {
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(
                sinks
                    .into_iter()
                    .map(|sink| SinkSlot {
                        sink,
                        degraded: AtomicBool::new(false),
                    })
                    .collect(),
            ),
        }
    }

    /// Console plus the JSONL file at `path`. Failing to open the file is fatal.
    pub fn open(path: &Path) -> Result<Self> {
        let file = JsonlSink::open(path)?;
        Ok(Self::new(vec![Box::new(ConsoleSink), Box::new(file)]))
    }

    /// Logger writing only into the returned memory sink.
    #[must_use]
    pub fn memory() -> (Self, MemorySink) {
        let sink = MemorySink::new();
        (Self::new(vec![Box::new(sink.clone())]), sink)
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn log(&self, event: ActivityEvent) {
        let entry = LogEntry {
            ts: Utc::now(),
            event,
        };
        for slot in self.sinks.iter() {
            if slot.degraded.load(Ordering::Relaxed) {
                continue;
            }
            if let Err(err) = slot.sink.write(&entry) {
                slot.degraded.store(true, Ordering::Relaxed);
                eprintln!(
                    "watchdog: log sink '{}' failed, continuing without it: {err}",
                    slot.sink.name()
                );
            }
        }
    }

    /// Whether any sink has been dropped after a write failure.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.sinks
            .iter()
            .any(|slot| slot.degraded.load(Ordering::Relaxed))
    }
}
