//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// Captured result of one CLI invocation.
pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// Transcript kept for post-mortem when an assertion fails.
    pub log_path: PathBuf,
}

fn log_dir() -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("cli-cases");
    std::fs::create_dir_all(&dir).expect("create cli case log dir");
    dir
}

/// Run the `watchdog` binary with `args` and record its transcript.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CliResult {
    let output = Command::new(env!("CARGO_BIN_EXE_watchdog"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("spawn watchdog binary");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let log_path = log_dir().join(format!("{case_name}.log"));
    let transcript = format!(
        "args: {args:?}\nstatus: {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
        output.status
    );
    std::fs::write(&log_path, transcript).expect("write cli case log");

    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
