//! Shared-access-signature tokens for the IoT Hub REST API.

use crate::connection::{ConnectionString, ConnectionStringError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Signs `SharedAccessSignature` tokens for one hub and access policy.
#[derive(Clone)]
pub struct SasTokenProvider {
    resource_uri: String,
    key_name: String,
    mac: HmacSha256,
    ttl: Duration,
}

impl SasTokenProvider {
    pub fn new(
        connection: &ConnectionString,
        ttl: Duration,
    ) -> Result<Self, ConnectionStringError> {
        Ok(Self {
            resource_uri: connection.host_name.clone(),
            key_name: connection.shared_access_key_name.clone(),
            mac: HmacSha256::new_from_slice(&connection.key_bytes()?)
                .map_err(|_| ConnectionStringError::InvalidKey)?,
            ttl,
        })
    }

    /// Token valid for the configured TTL from now.
    pub fn token(&self) -> String {
        self.token_at(Utc::now())
    }

    /// Token valid for the configured TTL from `now`.
    pub fn token_at(&self, now: DateTime<Utc>) -> String {
        let expiry = now.timestamp() + self.ttl.as_secs() as i64;
        self.token_expiring(expiry)
    }

    fn token_expiring(&self, expiry: i64) -> String {
        let resource = urlencoding::encode(&self.resource_uri);
        let to_sign = format!("{resource}\n{expiry}");

        let mut mac = self.mac.clone();
        mac.update(to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        format!(
            "SharedAccessSignature sr={resource}&sig={}&se={expiry}&skn={}",
            urlencoding::encode(&signature),
            urlencoding::encode(&self.key_name)
        )
    }
}

impl std::fmt::Debug for SasTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasTokenProvider")
            .field("resource_uri", &self.resource_uri)
            .field("key_name", &self.key_name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
