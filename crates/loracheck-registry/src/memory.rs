//! Process-local registry.
//!
//! Stores twins in the same shape the IoT Hub returns them, so listing yields
//! comparable records. Nothing is persisted.

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Stream;
use loracheck_core::{
    strip_twin_metadata, BulkRegistryResult, DesiredProperties, DeviceRegistryError,
    GatewayResult, RegistryGateway, TwinDocument,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory [`RegistryGateway`], ordered by device id.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    devices: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `(device_id, desired)` pairs.
    pub fn with_twins<I, S>(twins: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let devices = twins
            .into_iter()
            .map(|(id, desired)| {
                let id = id.into();
                let record = twin_record(&id, desired);
                (id, record)
            })
            .collect();
        Self {
            devices: RwLock::new(devices),
        }
    }

    /// Insert or replace a twin's desired properties.
    pub async fn put_twin(&self, device_id: impl Into<String>, desired: Value) {
        let device_id = device_id.into();
        let record = twin_record(&device_id, desired);
        self.devices.write().await.insert(device_id, record);
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

fn twin_record(device_id: &str, desired: Value) -> Value {
    json!({
        "deviceId": device_id,
        "status": "enabled",
        "version": 1,
        "properties": { "desired": desired, "reported": {} }
    })
}

#[async_trait]
impl RegistryGateway for InMemoryRegistry {
    async fn fetch_twin(&self, device_id: &str) -> GatewayResult<Option<TwinDocument>> {
        let devices = self.devices.read().await;
        let desired = devices
            .get(device_id)
            .and_then(|record| record.pointer("/properties/desired"))
            .map(|desired| match desired {
                Value::Object(map) => strip_twin_metadata(map.clone()),
                _ => TwinDocument::new(),
            });
        Ok(desired)
    }

    async fn create_device_with_twin(
        &self,
        device_id: &str,
        desired: &DesiredProperties,
    ) -> GatewayResult<BulkRegistryResult> {
        let mut devices = self.devices.write().await;
        if devices.contains_key(device_id) {
            return Ok(BulkRegistryResult::failure(vec![DeviceRegistryError {
                device_id: device_id.to_string(),
                error_code: "DeviceAlreadyExists".to_string(),
                error_status: format!("A device with ID '{device_id}' is already registered."),
            }]));
        }

        devices.insert(
            device_id.to_string(),
            twin_record(device_id, desired.to_json()),
        );
        debug!(device_id, "Device created in memory");
        Ok(BulkRegistryResult::success())
    }

    fn list_devices(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> BoxStream<'_, GatewayResult<Value>> {
        Box::pin(self.pages(page_size, total_limit))
    }
}

impl InMemoryRegistry {
    fn pages(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> impl Stream<Item = GatewayResult<Value>> + Send + '_ {
        stream! {
            let records: Vec<Value> = self
                .devices
                .read()
                .await
                .values()
                .take(total_limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();

            for (page_number, page) in records.chunks(page_size.max(1)).enumerate() {
                debug!(page = page_number + 1, records = page.len(), "Serving device page");
                for record in page {
                    yield Ok(record.clone());
                }
            }
        }
    }
}
