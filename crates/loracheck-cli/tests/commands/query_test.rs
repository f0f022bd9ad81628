//! Tests for the `query` command.

use assert_cmd::Command;
use predicates::prelude::*;

/// Test that an invalid connection string from the environment is reported.
#[test]
fn test_query_invalid_connection_string() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.env("IOTHUB_CONNECTION_STRING", "HostName=hub.azure-devices.net")
        .arg("query")
        .arg("--deveui")
        .arg("0011");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid IoT Hub connection string"))
        .stderr(predicate::str::contains("SharedAccessKeyName"));
}
