//! Caller-facing device checker.
//!
//! Wraps a [`RegistryGateway`] with the verify and provision operations. Each
//! call performs at most one registry read or one registry write and keeps no
//! state between calls.

use crate::activation::ActivationKind;
use crate::classifier::verify_existing;
use crate::credentials::{DeviceCredentials, TwinDocument};
use crate::error::{Error, Result};
use crate::gateway::{BulkRegistryResult, GatewayResult, RegistryGateway};
use crate::outcome::ValidationOutcome;
use crate::provisioning::{self, Provisioning, ProvisioningRequest};
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{info, warn};

/// Verification of an existing device twin.
#[derive(Debug, Clone)]
pub struct DeviceVerification {
    pub device_id: String,
    pub twin: TwinDocument,
    pub kind: ActivationKind,
    pub outcome: ValidationOutcome,
}

impl DeviceVerification {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }
}

/// Provisioning result plus the registry's answer, if anything was submitted.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub provisioning: Provisioning,
    /// `None` when validation failed and nothing was submitted.
    pub registration: Option<BulkRegistryResult>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.registration
            .as_ref()
            .is_some_and(|r| r.is_successful)
    }
}

/// Verifies and provisions LoRaWAN devices against a registry.
pub struct DeviceChecker {
    gateway: Arc<dyn RegistryGateway>,
}

impl DeviceChecker {
    pub fn new(gateway: Arc<dyn RegistryGateway>) -> Self {
        Self { gateway }
    }

    /// Desired properties of a device twin.
    pub async fn query_twin(&self, device_id: &str) -> Result<TwinDocument> {
        self.gateway
            .fetch_twin(device_id)
            .await?
            .ok_or_else(|| Error::DeviceNotFound {
                device_id: device_id.to_string(),
            })
    }

    /// Fetch, classify and validate an existing device.
    pub async fn verify_device(&self, device_id: &str) -> Result<DeviceVerification> {
        let twin = self.query_twin(device_id).await?;
        let credentials = DeviceCredentials::from_twin(device_id, &twin);
        let (kind, outcome) = verify_existing(&credentials);

        if outcome.is_valid() {
            info!(device_id, kind = %kind, "Device configuration is valid");
        } else {
            warn!(device_id, kind = %kind, "Device configuration is not valid");
        }

        Ok(DeviceVerification {
            device_id: device_id.to_string(),
            twin,
            kind,
            outcome,
        })
    }

    /// Prepare an ABP device without contacting the registry.
    pub fn provision_abp(&self, credentials: DeviceCredentials) -> Provisioning {
        provisioning::prepare_abp(credentials)
    }

    /// Prepare an OTAA device without contacting the registry.
    pub fn provision_otaa(&self, credentials: DeviceCredentials) -> Provisioning {
        provisioning::prepare_otaa(credentials)
    }

    /// Submit a prepared device.
    ///
    /// Returns `None` without touching the registry when the provisioning has
    /// no payload. Otherwise the twin is submitted exactly once.
    pub async fn register(&self, prepared: &Provisioning) -> Result<Option<BulkRegistryResult>> {
        let (Some(payload), Some(device_id)) = (&prepared.payload, prepared.device_id()) else {
            warn!(mode = %prepared.mode, "Can not add {} device", prepared.mode);
            return Ok(None);
        };

        info!(device_id, mode = %prepared.mode, "Adding {} device to registry", prepared.mode);
        let result = self
            .gateway
            .create_device_with_twin(device_id, payload)
            .await?;

        if result.is_successful {
            info!(device_id, "Device added");
        } else {
            for error in &result.errors {
                warn!(
                    device_id = %error.device_id,
                    code = %error.error_code,
                    status = %error.error_status,
                    "Error adding device"
                );
            }
        }
        Ok(Some(result))
    }

    /// Prepare and, when valid, register a device.
    pub async fn provision(&self, request: ProvisioningRequest) -> Result<ProvisionReport> {
        let prepared = provisioning::prepare(request);
        let registration = self.register(&prepared).await?;
        Ok(ProvisionReport {
            provisioning: prepared,
            registration,
        })
    }

    /// Raw twin records, paged lazily from the registry.
    pub fn list_devices(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> BoxStream<'_, GatewayResult<serde_json::Value>> {
        self.gateway.list_devices(page_size, total_limit)
    }
}
