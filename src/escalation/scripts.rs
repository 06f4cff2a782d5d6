//! Recovery scripts: executables in a directory selected by file-name prefix.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{EscalationAction, EscalationReport, RecoveryAction};
use crate::core::errors::{Result, WatchdogError};

/// Runs every regular file in `dir` whose name starts with `prefix`, in
/// lexical file-name order, one after another.
#[derive(Debug, Clone)]
pub struct RecoveryScripts {
    dir: PathBuf,
    prefix: String,
}

impl RecoveryScripts {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_one(action: &RecoveryAction) -> std::result::Result<(), String> {
        let status = Command::new(&action.path)
            .current_dir(action.path.parent().unwrap_or_else(|| Path::new("/")))
            .status()
            .map_err(|err| err.to_string())?;
        if status.success() {
            Ok(())
        } else {
            Err(status.to_string())
        }
    }
}

impl EscalationAction for RecoveryScripts {
    fn candidates(&self) -> Result<Vec<RecoveryAction>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| WatchdogError::ScriptDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut actions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| WatchdogError::ScriptDir {
                path: self.dir.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&self.prefix) {
                continue;
            }
            // Follows symlinks so linked scripts are eligible.
            let is_file = std::fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file());
            if !is_file {
                continue;
            }
            actions.push(RecoveryAction {
                name,
                path: entry.path(),
            });
        }
        actions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(actions)
    }

    fn run_escalation(&self) -> EscalationReport {
        let mut report = EscalationReport::default();
        let actions = match self.candidates() {
            Ok(actions) => actions,
            Err(err) => {
                report.last_error = Some(err.to_string());
                return report;
            }
        };
        for action in &actions {
            match Self::run_one(action) {
                Ok(()) => report.record_success(&action.name),
                Err(error) => report.record_failure(&action.name, error),
            }
        }
        report
    }
}
