//! Tests for the `verify` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Test that verify requires a device id.
#[test]
fn test_verify_requires_deveui() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("verify");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--deveui"));
}

/// Test that a missing settings file prints the expected format.
#[test]
fn test_verify_without_settings_shows_format() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("IOTHUB_CONNECTION_STRING")
        .arg("verify")
        .arg("--deveui")
        .arg("0011");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Could not read settings file settings.json"))
        .stderr(predicate::str::contains("The format should be"))
        .stdout(predicate::str::contains("Terminated with errors."));
}

/// Test that a settings file without a connection string is rejected.
#[test]
fn test_verify_with_empty_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    fs::write(&path, "{}").unwrap();

    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.env_remove("IOTHUB_CONNECTION_STRING")
        .arg("verify")
        .arg("--deveui")
        .arg("0011")
        .arg("--settings")
        .arg(&path);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("IoTHubConnectionString is missing"))
        .stderr(predicate::str::contains("The format should be"));
}
