//! Device registry interface.
//!
//! The checks in this crate never perform I/O. Everything that talks to the
//! remote device-twin store goes through [`RegistryGateway`], implemented by
//! the `loracheck-registry` crate.

use crate::credentials::{DesiredProperties, TwinDocument};
use crate::error::GatewayError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Result type for gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Per-device error reported by a bulk registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistryError {
    pub device_id: String,
    pub error_code: String,
    #[serde(default)]
    pub error_status: String,
}

/// Result of a bulk registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRegistryResult {
    pub is_successful: bool,
    #[serde(default)]
    pub errors: Vec<DeviceRegistryError>,
}

impl BulkRegistryResult {
    pub fn success() -> Self {
        Self {
            is_successful: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<DeviceRegistryError>) -> Self {
        Self {
            is_successful: false,
            errors,
        }
    }
}

/// Remote device-twin store.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Desired properties of the device twin, `None` when the device is unknown.
    async fn fetch_twin(&self, device_id: &str) -> GatewayResult<Option<TwinDocument>>;

    /// Register a device together with its twin's desired properties.
    async fn create_device_with_twin(
        &self,
        device_id: &str,
        desired: &DesiredProperties,
    ) -> GatewayResult<BulkRegistryResult>;

    /// Lazily page through raw twin records.
    ///
    /// Pages hold `page_size` records; the stream ends after `total_limit`
    /// records when set. The stream cannot be restarted.
    fn list_devices(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> BoxStream<'_, GatewayResult<serde_json::Value>>;
}
