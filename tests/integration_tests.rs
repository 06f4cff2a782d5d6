//! Integration smoke tests for the `watchdog` CLI surface.

mod common;

use std::path::Path;

fn empty_config(dir: &Path) -> String {
    let path = dir.join("watchdog.toml");
    std::fs::write(&path, "").expect("write config");
    path.display().to_string()
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: watchdog [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("watchdog"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn server_without_key_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let result = common::run_cli_case(
        "server_without_key_refuses_to_start",
        &["--config", &config, "server"],
    );
    assert!(
        !result.status.success(),
        "expected failure; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stderr.contains("WD-1001"),
        "expected invalid config code; log: {}",
        result.log_path.display()
    );
}

#[test]
fn client_without_remote_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let result = common::run_cli_case(
        "client_without_remote_refuses_to_start",
        &["--config", &config, "client", "--key", "abc123"],
    );
    assert!(
        !result.status.success(),
        "expected failure; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stderr.contains("remote host"),
        "expected remote host complaint; log: {}",
        result.log_path.display()
    );
}

#[test]
fn missing_explicit_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml").display().to_string();
    let result = common::run_cli_case(
        "missing_explicit_config_is_reported",
        &["--config", &missing, "config"],
    );
    assert!(
        !result.status.success(),
        "expected failure; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stderr.contains("WD-1002"),
        "expected missing config code; log: {}",
        result.log_path.display()
    );
    assert!(
        !result.stderr.contains("retrying may succeed"),
        "configuration errors are not transient; log: {}",
        result.log_path.display()
    );
}

#[test]
fn unreadable_config_suggests_retrying() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().display().to_string();
    let result = common::run_cli_case(
        "unreadable_config_suggests_retrying",
        &["--config", &path, "config"],
    );
    assert!(
        !result.status.success(),
        "expected failure; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stderr.contains("WD-3002") && result.stderr.contains("retrying may succeed"),
        "expected io code with retry hint; log: {}",
        result.log_path.display()
    );
}

#[test]
fn occupied_port_is_a_fatal_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();
    let logs = dir.path().join("watchdog.jsonl").display().to_string();
    let result = common::run_cli_case(
        "occupied_port_is_a_fatal_startup_error",
        &[
            "--config", &config, "server", "--key", "abc123", "--bind", "127.0.0.1", "--port",
            &port, "--logs", &logs,
        ],
    );
    assert!(
        !result.status.success(),
        "expected failure; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stderr.contains("WD-2001"),
        "expected bind failure code; log: {}",
        result.log_path.display()
    );
}

#[test]
fn config_command_redacts_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watchdog.toml");
    std::fs::write(&path, "key = \"s3cret\"\ntimeout = 2\n").unwrap();
    let config = path.display().to_string();
    let result = common::run_cli_case(
        "config_command_redacts_key",
        &["--config", &config, "config", "--json"],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        !result.stdout.contains("s3cret") && result.stdout.contains("\"timeout\": 2"),
        "expected redacted JSON config; log: {}",
        result.log_path.display()
    );
}

#[test]
fn scripts_command_lists_prefixed_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let scripts = dir.path().join("scripts");
    std::fs::create_dir(&scripts).unwrap();
    std::fs::write(scripts.join("00-restart"), "#!/bin/sh\n").unwrap();
    std::fs::write(scripts.join("50-skipped"), "#!/bin/sh\n").unwrap();
    let scripts_arg = scripts.display().to_string();

    let result = common::run_cli_case(
        "scripts_command_lists_prefixed_scripts",
        &["--config", &config, "scripts", "--dir", &scripts_arg],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("00-restart") && !result.stdout.contains("50-skipped"),
        "expected only prefixed scripts; log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_command_generates_shell_script() {
    let result = common::run_cli_case(
        "completions_command_generates_shell_script",
        &["completions", "bash"],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("watchdog"),
        "expected completion script contents; log: {}",
        result.log_path.display()
    );
}
