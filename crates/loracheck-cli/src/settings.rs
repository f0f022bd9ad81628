//! Local settings: the IoT Hub connection string.

use anyhow::{bail, Context, Result};
use loracheck_registry::ConnectionString;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Printed whenever settings can not be loaded.
pub const FORMAT_HINT: &str = "The format should be: { \"IoTHubConnectionString\" : \"HostName=xxx.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=xxx\" }";

/// Environment variable names.
pub mod env_vars {
    /// Overrides the connection string from the settings file.
    pub const IOTHUB_CONNECTION_STRING: &str = "IOTHUB_CONNECTION_STRING";
    /// `true` switches log output to JSON.
    pub const LOG_JSON: &str = "LORACHECK_LOG_JSON";
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(rename = "IoTHubConnectionString", default)]
    iot_hub_connection_string: Option<String>,
}

/// Resolve the connection string, preferring the environment over `path`.
pub fn load(path: &Path) -> Result<ConnectionString> {
    let from_env = std::env::var(env_vars::IOTHUB_CONNECTION_STRING).ok();
    resolve(path, from_env)
}

fn resolve(path: &Path, from_env: Option<String>) -> Result<ConnectionString> {
    let raw = match from_env.filter(|v| !v.trim().is_empty()) {
        Some(value) => value,
        None => read_file(path)?,
    };
    raw.parse::<ConnectionString>()
        .context("Invalid IoT Hub connection string")
}

fn read_file(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read settings file {}", path.display()))?;
    let settings: SettingsFile = serde_json::from_str(&text)
        .with_context(|| format!("Could not parse settings file {}", path.display()))?;

    match settings.iot_hub_connection_string {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("IoTHubConnectionString is missing in {}", path.display()),
    }
}
