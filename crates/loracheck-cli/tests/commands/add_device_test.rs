//! Tests for the `addabpdevice` and `addotaadevice` commands.

use assert_cmd::Command;
use predicates::prelude::*;

const KEY_16: &str = "00112233445566778899AABBCCDDEEFF";

/// Test that a dry run generates every missing ABP field.
#[test]
fn test_add_abp_dry_run_generates_keys() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("addabpdevice").arg("--dry-run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Info: Generating missing DevEUI"))
        .stdout(predicate::str::contains("Info: Generating missing AppEUI"))
        .stdout(predicate::str::contains("Info: Generating missing AppKey"))
        .stdout(predicate::str::contains("\"AppEUI\""))
        .stdout(predicate::str::contains("\"SensorDecoder\": \"\""))
        .stdout(predicate::str::contains("Successfully terminated."));
}

/// Test that a dry run never reads the settings file.
#[test]
fn test_add_dry_run_ignores_settings() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.env_remove("IOTHUB_CONNECTION_STRING")
        .arg("addotaadevice")
        .arg("--dry-run")
        .arg("--settings")
        .arg("/nonexistent/settings.json");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("The format should be").not());
}

/// Test that a malformed key fails validation.
#[test]
fn test_add_abp_invalid_key() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("addabpdevice")
        .arg("--appkey")
        .arg("bad")
        .arg("--dry-run");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Error: AppKey is invalid."))
        .stdout(predicate::str::contains("Error: Can not add ABP device."))
        .stdout(predicate::str::contains("Terminated with errors."));
}

/// Test that supplied OTAA values are kept and optional fields included.
#[test]
fn test_add_otaa_dry_run_with_values() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("addotaadevice")
        .arg("--deveui")
        .arg("'otaa-1'")
        .arg("--nwkskey")
        .arg(KEY_16)
        .arg("--devaddr")
        .arg("01020304")
        .arg("--decoder")
        .arg("http://decoders/api/lpp")
        .arg("--classtype")
        .arg("c")
        .arg("--dry-run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Info: NwkSKey is valid: 00112233445566778899AABBCCDDEEFF"))
        .stdout(predicate::str::contains("Info: Generating missing AppSKey"))
        .stdout(predicate::str::contains("Info: Generating missing DevEUI").not())
        .stdout(predicate::str::contains("device otaa-1 was not submitted"))
        .stdout(predicate::str::contains("\"DevAddr\": \"01020304\""))
        .stdout(predicate::str::contains("\"ClassType\": \"c\""));
}

/// Test that a decoder with an uppercase host is rejected with the usage hint.
#[test]
fn test_add_otaa_bad_decoder() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.arg("addotaadevice")
        .arg("--decoder")
        .arg("http://Decoders/lpp")
        .arg("--dry-run");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Hostname must be all lowercase"))
        .stdout(predicate::str::contains("missing \"api\" keyword"))
        .stdout(predicate::str::contains("Hint: Make sure the URI based SensorDecoder"));
}

/// Test that an invalid device is rejected before settings are read.
#[test]
fn test_add_invalid_device_skips_registry() {
    let mut cmd = Command::cargo_bin("loracheck").unwrap();
    cmd.env_remove("IOTHUB_CONNECTION_STRING")
        .arg("addabpdevice")
        .arg("--classtype")
        .arg("B")
        .arg("--settings")
        .arg("/nonexistent/settings.json");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("ClassType"))
        .stderr(predicate::str::contains("The format should be").not());
}
