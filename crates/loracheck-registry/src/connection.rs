//! IoT Hub connection strings.
//!
//! Format: `HostName=<host>;SharedAccessKeyName=<policy>;SharedAccessKey=<base64>`.
//! Part names are matched case-insensitively and may appear in any order.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;

const HOST_NAME: &str = "HostName";
const KEY_NAME: &str = "SharedAccessKeyName";
const KEY: &str = "SharedAccessKey";

/// Connection string parse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionStringError {
    #[error("Connection string is empty")]
    Empty,

    #[error("Malformed connection string part '{0}', expected Name=Value")]
    MalformedPart(String),

    #[error("Connection string is missing {0}")]
    MissingPart(&'static str),

    #[error("SharedAccessKey is not valid base64")]
    InvalidKey,
}

/// Parsed hub connection string.
///
/// [`Display`](fmt::Display) never includes the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host_name: String,
    pub shared_access_key_name: String,
    pub shared_access_key: String,
}

impl ConnectionString {
    /// Decoded bytes of the shared access key.
    pub fn key_bytes(&self) -> Result<Vec<u8>, ConnectionStringError> {
        STANDARD
            .decode(self.shared_access_key.as_bytes())
            .map_err(|_| ConnectionStringError::InvalidKey)
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may end in '=', so split at the first one.
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedPart(redact(part)))?;
            let value = value.trim().to_string();
            match name.trim() {
                n if n.eq_ignore_ascii_case(HOST_NAME) => host_name = Some(value),
                n if n.eq_ignore_ascii_case(KEY_NAME) => key_name = Some(value),
                n if n.eq_ignore_ascii_case(KEY) => key = Some(value),
                // DeviceId, GatewayHostName and friends are not used here.
                _ => {}
            }
        }

        let parsed = Self {
            host_name: non_empty(host_name).ok_or(ConnectionStringError::MissingPart(HOST_NAME))?,
            shared_access_key_name: non_empty(key_name)
                .ok_or(ConnectionStringError::MissingPart(KEY_NAME))?,
            shared_access_key: non_empty(key).ok_or(ConnectionStringError::MissingPart(KEY))?,
        };
        parsed.key_bytes()?;
        Ok(parsed)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HostName={};SharedAccessKeyName={};SharedAccessKey=***",
            self.host_name, self.shared_access_key_name
        )
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn redact(part: &str) -> String {
    part.chars().take(12).collect::<String>() + "..."
}
