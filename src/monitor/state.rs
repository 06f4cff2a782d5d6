//! Shared heartbeat bookkeeping: last valid heartbeat and consecutive misses.
//!
//! One lock guards both fields. Every method takes it exactly once and never
//! performs I/O while holding it, so the accept path and the deadline checker
//! observe a single total order of updates.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time copy of the guarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatRecord {
    /// Time of the last valid heartbeat (process start until the first one).
    pub last_seen: Instant,
    /// Consecutive checker ticks without a fresh heartbeat.
    pub miss_count: u32,
}

/// Result of one deadline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TickVerdict {
    /// A heartbeat arrived within the window; misses were cleared.
    Fresh { elapsed_ms: u64 },
    /// Window expired; the counter grew but is below the threshold.
    Missed { elapsed_ms: u64, misses: u32 },
    /// Threshold reached; the counter was cleared and escalation is due.
    Escalate { elapsed_ms: u64, misses: u32 },
}

impl TickVerdict {
    #[must_use]
    pub const fn should_escalate(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }
}

/// Heartbeat state shared between connection handlers and the checker.
#[derive(Debug)]
pub struct HeartbeatState {
    inner: Mutex<HeartbeatRecord>,
}

impl HeartbeatState {
    #[must_use]
    pub fn new(started_at: Instant) -> Self {
        Self {
            inner: Mutex::new(HeartbeatRecord {
                last_seen: started_at,
                miss_count: 0,
            }),
        }
    }

    /// Register a validated heartbeat observed at `now`.
    ///
    /// `last_seen` only moves forward: a handler that sampled its clock
    /// before a concurrent one cannot pull the timestamp back.
    pub fn record_heartbeat(&self, now: Instant) {
        let mut record = self.inner.lock();
        record.last_seen = record.last_seen.max(now);
        record.miss_count = 0;
    }

    /// The checker's read-modify-write for one tick.
    pub fn evaluate(&self, now: Instant, timeout: Duration, threshold: u32) -> TickVerdict {
        let mut record = self.inner.lock();
        let elapsed = now.saturating_duration_since(record.last_seen);
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        if elapsed <= timeout {
            record.miss_count = 0;
            return TickVerdict::Fresh { elapsed_ms };
        }

        record.miss_count = record.miss_count.saturating_add(1);
        let misses = record.miss_count;
        if misses >= threshold {
            record.miss_count = 0;
            TickVerdict::Escalate { elapsed_ms, misses }
        } else {
            TickVerdict::Missed { elapsed_ms, misses }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> HeartbeatRecord {
        *self.inner.lock()
    }
}
