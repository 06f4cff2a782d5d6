//! Periodic deadline checker and escalation policy.
//!
//! The check period equals the heartbeat timeout, so `attempts` consecutive
//! misses means no valid heartbeat for roughly `attempts × timeout`.
//! Escalation runs on the checker thread after the state lock is released;
//! ticks that fire while it runs are coalesced by the tick channel.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::tick;

use super::clock::Clock;
use super::state::{HeartbeatState, TickVerdict};
use crate::escalation::{ActionStatus, EscalationAction, EscalationReport};
use crate::logger::{ActivityEvent, ActivityLogger};

/// Drives the miss counter and fires escalation at the threshold.
pub struct DeadlineChecker {
    state: Arc<HeartbeatState>,
    clock: Arc<dyn Clock>,
    escalation: Arc<dyn EscalationAction>,
    logger: ActivityLogger,
    timeout: Duration,
    threshold: u32,
}

impl std::fmt::Debug for DeadlineChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineChecker")
            .field("timeout", &self.timeout)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl DeadlineChecker {
    #[must_use]
    pub fn new(
        state: Arc<HeartbeatState>,
        clock: Arc<dyn Clock>,
        escalation: Arc<dyn EscalationAction>,
        logger: ActivityLogger,
        timeout: Duration,
        threshold: u32,
    ) -> Self {
        Self {
            state,
            clock,
            escalation,
            logger,
            timeout,
            threshold: threshold.max(1),
        }
    }

    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.timeout
    }

    /// One check: evaluate under the lock, then escalate outside it.
    pub fn tick(&self) -> TickVerdict {
        let verdict = self
            .state
            .evaluate(self.clock.now(), self.timeout, self.threshold);
        self.logger.log(ActivityEvent::DeadlineCheck {
            verdict,
            threshold: self.threshold,
        });

        if let TickVerdict::Escalate { misses, .. } = verdict {
            self.logger.log(ActivityEvent::EscalationStarted { misses });
            let report = self.escalation.run_escalation();
            self.log_report(&report);
        }
        verdict
    }

    fn log_report(&self, report: &EscalationReport) {
        for outcome in &report.outcomes {
            let event = match &outcome.status {
                ActionStatus::Succeeded => ActivityEvent::RecoveryActionSucceeded {
                    action: outcome.action.clone(),
                },
                ActionStatus::Failed { error } => ActivityEvent::RecoveryActionFailed {
                    action: outcome.action.clone(),
                    error: error.clone(),
                },
            };
            self.logger.log(event);
        }
        self.logger.log(ActivityEvent::EscalationFinished {
            ran: report.ran,
            failed: report.failed,
            last_error: report.last_error.clone(),
        });
    }

    /// Check forever, once per period.
    pub fn run(&self) {
        let ticker = tick(self.period());
        for _ in ticker.iter() {
            self.tick();
        }
    }

    /// Run on a dedicated named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("deadline-checker".to_string())
            .spawn(move || self.run())
    }
}
