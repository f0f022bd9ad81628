//! Provisioning pipeline for new devices.
//!
//! Each stage takes a [`DeviceCredentials`] value and returns a new one:
//!
//! 1. [`backfill`] generates key material for required fields left blank
//! 2. [`sanitize`] strips apostrophes from every populated field
//! 3. [`validate_credentials`] checks every field for the chosen mode
//! 4. [`build_payload`] assembles the desired properties, only when valid
//!
//! [`prepare`] runs the stages in that order.

use crate::activation::{ActivationMode, ActivationProfile};
use crate::credentials::{CredentialField, DesiredProperties, DeviceCredentials};
use crate::keygen;
use crate::outcome::ValidationOutcome;
use crate::sanitize::clean;
use crate::validator::validate_credentials;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Caller-supplied partial credentials plus the activation mode to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub mode: ActivationMode,
    pub credentials: DeviceCredentials,
}

impl ProvisioningRequest {
    pub fn new(mode: ActivationMode, credentials: DeviceCredentials) -> Self {
        Self { mode, credentials }
    }

    pub fn abp(credentials: DeviceCredentials) -> Self {
        Self::new(ActivationMode::Abp, credentials)
    }

    pub fn otaa(credentials: DeviceCredentials) -> Self {
        Self::new(ActivationMode::Otaa, credentials)
    }
}

/// Result of the backfill stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backfilled {
    pub credentials: DeviceCredentials,
    /// Fields that were generated, in generation order.
    pub generated: Vec<CredentialField>,
}

/// Prepared device: final credentials, their validation and, when valid, the
/// payload to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioning {
    pub mode: ActivationMode,
    pub credentials: DeviceCredentials,
    pub generated: Vec<CredentialField>,
    pub outcome: ValidationOutcome,
    pub payload: Option<DesiredProperties>,
}

impl Provisioning {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    /// Device identifier the payload will be registered under.
    pub fn device_id(&self) -> Option<&str> {
        self.credentials.get(CredentialField::DevEui)
    }
}

/// Fill every blank required field of `profile` with random key material.
pub fn backfill<R: Rng + ?Sized>(
    profile: &ActivationProfile,
    credentials: DeviceCredentials,
    rng: &mut R,
) -> Backfilled {
    let mut credentials = credentials;
    let mut generated = Vec::new();

    for spec in profile.backfill_fields() {
        if credentials.has(spec.field) {
            continue;
        }
        let value = keygen::generate_with(rng, spec.bytes);
        info!(field = %spec.field, "Generating missing {}", spec.field);
        debug!(field = %spec.field, value = %value, "Generated key material");
        credentials = credentials.with(spec.field, value);
        generated.push(spec.field);
    }

    Backfilled {
        credentials,
        generated,
    }
}

/// Strip apostrophes from every field. Fields left empty become absent.
pub fn sanitize(credentials: DeviceCredentials) -> DeviceCredentials {
    DeviceCredentials::FIELDS
        .iter()
        .fold(credentials, |creds, field| {
            let cleaned = clean(creds.get(*field));
            creds.with_opt(*field, cleaned)
        })
}

/// Assemble the desired-property payload for `profile`.
///
/// Contains the profile's keys, `GatewayID` when set, `SensorDecoder`
/// (empty when unset) and `ClassType` when set.
pub fn build_payload(
    profile: &ActivationProfile,
    credentials: &DeviceCredentials,
) -> DesiredProperties {
    let mut payload = DesiredProperties::new();

    for spec in profile.keys {
        payload.insert(spec.field, credentials.get(spec.field).unwrap_or_default());
    }
    if let Some(gateway) = credentials.get(CredentialField::GatewayId) {
        payload.insert(CredentialField::GatewayId, gateway);
    }
    payload.insert(
        CredentialField::SensorDecoder,
        credentials.get(CredentialField::SensorDecoder).unwrap_or_default(),
    );
    if let Some(class) = credentials.get(CredentialField::ClassType) {
        payload.insert(CredentialField::ClassType, class);
    }

    payload
}

/// Run the full pipeline with the thread-local random source.
pub fn prepare(request: ProvisioningRequest) -> Provisioning {
    prepare_with(request, &mut rand::thread_rng())
}

/// Run the full pipeline drawing generated keys from `rng`.
pub fn prepare_with<R: Rng + ?Sized>(request: ProvisioningRequest, rng: &mut R) -> Provisioning {
    let profile = request.mode.profile();

    let Backfilled {
        credentials,
        generated,
    } = backfill(profile, request.credentials, rng);
    let credentials = sanitize(credentials);
    let outcome = validate_credentials(profile, &credentials);
    let payload = outcome
        .is_valid()
        .then(|| build_payload(profile, &credentials));

    Provisioning {
        mode: request.mode,
        credentials,
        generated,
        outcome,
        payload,
    }
}

/// Prepare an ABP device from partial credentials.
pub fn prepare_abp(credentials: DeviceCredentials) -> Provisioning {
    prepare(ProvisioningRequest::abp(credentials))
}

/// Prepare an OTAA device from partial credentials.
pub fn prepare_otaa(credentials: DeviceCredentials) -> Provisioning {
    prepare(ProvisioningRequest::otaa(credentials))
}
