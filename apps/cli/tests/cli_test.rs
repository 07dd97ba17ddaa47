//! Integration tests for the `sharex` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sharex() -> Command {
    Command::cargo_bin("sharex").unwrap()
}

#[test]
fn test_help_lists_commands() {
    sharex()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("users"))
        .stdout(predicate::str::contains("public-data"))
        .stdout(predicate::str::contains("db"));
}

#[test]
fn test_db_help_lists_operations() {
    sharex()
        .args(["db", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("insert"))
        .stdout(predicate::str::contains("find"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn test_missing_location_fails() {
    sharex()
        .arg("users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("host location"));
}

#[test]
fn test_page_url_without_port_fails() {
    sharex()
        .args(["--page-url", "http://localhost/SharexApp/chess/", "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --page-url"));
}

#[test]
fn test_host_requires_port() {
    sharex()
        .args(["--host", "localhost", "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--host requires --port"));
}

#[test]
fn test_invalid_file_data_is_rejected() {
    sharex()
        .args(["--port", "8080", "file", "write", "scores.json", "{broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("data must be valid JSON"));
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("sharex.toml");
    fs::write(&config, "reconnect_interval = \"soon\"\n").unwrap();

    sharex()
        .arg("--config")
        .arg(&config)
        .arg("users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("reconnect_interval must be"));
}

#[test]
fn test_unreachable_host_times_out() {
    sharex()
        .args(["--port", "1", "--timeout", "1", "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timed out connecting to ws://localhost:2"));
}
