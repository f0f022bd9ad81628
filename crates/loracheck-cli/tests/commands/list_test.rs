//! Tests for the `list` command.

use assert_cmd::Command;
use predicates::prelude::*;

const UNREACHABLE_HUB: &str =
    "HostName=127.0.0.1:1;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0LWtleQ==";

/// Test that page and total must be numbers.
#[test]
fn test_list_rejects_non_numeric_page() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("list").arg("--page").arg("ten");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

/// Test that an unreachable hub fails the command without printing the key.
#[test]
fn test_list_unreachable_hub() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.env("IOTHUB_CONNECTION_STRING", UNREACHABLE_HUB)
        .arg("list")
        .arg("--total")
        .arg("5");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Using IoT Hub 127.0.0.1:1 with policy iothubowner"))
        .stdout(predicate::str::contains("c2VjcmV0LWtleQ").not())
        .stderr(predicate::str::contains("Communication error"));
}
