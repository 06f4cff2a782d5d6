//! Escalation boundary: what the deadline checker runs once misses reach the
//! threshold.

#![allow(missing_docs)]

pub mod scripts;

use std::path::PathBuf;

use serde::Serialize;

use crate::core::errors::Result;

pub use scripts::RecoveryScripts;

/// A recovery procedure that would run on escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryAction {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    Succeeded,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: String,
    #[serde(flatten)]
    pub status: ActionStatus,
}

/// Result of one escalation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EscalationReport {
    /// Actions that were started.
    pub ran: usize,
    pub failed: usize,
    /// Most recent failure, including failure to enumerate actions at all.
    pub last_error: Option<String>,
    pub outcomes: Vec<ActionOutcome>,
}

impl EscalationReport {
    pub fn record_success(&mut self, action: impl Into<String>) {
        self.ran += 1;
        self.outcomes.push(ActionOutcome {
            action: action.into(),
            status: ActionStatus::Succeeded,
        });
    }

    pub fn record_failure(&mut self, action: impl Into<String>, error: impl Into<String>) {
        let error = error.into();
        self.ran += 1;
        self.failed += 1;
        self.last_error = Some(error.clone());
        self.outcomes.push(ActionOutcome {
            action: action.into(),
            status: ActionStatus::Failed { error },
        });
    }
}

/// Capability to run recovery actions now.
///
/// Implementations are best-effort: failures end up in the report, never in
/// a panic or an early return that skips the remaining actions.
pub trait EscalationAction: Send + Sync {
    /// Actions the next escalation would run, in run order.
    fn candidates(&self) -> Result<Vec<RecoveryAction>>;

    fn run_escalation(&self) -> EscalationReport;
}
