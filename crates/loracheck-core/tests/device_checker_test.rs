//! Tests for DeviceChecker against a scripted registry.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use loracheck_core::{
    ActivationKind, BulkRegistryResult, CredentialField, DesiredProperties, DeviceChecker,
    DeviceCredentials, DeviceRegistryError, Error, GatewayError, GatewayResult,
    ProvisioningRequest, RegistryGateway, TwinDocument, ValidationError,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry double that serves fixed twins and records every create call.
#[derive(Default)]
struct ScriptedRegistry {
    twins: HashMap<String, TwinDocument>,
    created: Mutex<Vec<(String, DesiredProperties)>>,
    reject_creates: bool,
    offline: bool,
}

impl ScriptedRegistry {
    fn with_twin(mut self, id: &str, twin: serde_json::Value) -> Self {
        self.twins
            .insert(id.to_string(), twin.as_object().cloned().unwrap());
        self
    }

    fn created(&self) -> Vec<(String, DesiredProperties)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryGateway for ScriptedRegistry {
    async fn fetch_twin(&self, device_id: &str) -> GatewayResult<Option<TwinDocument>> {
        if self.offline {
            return Err(GatewayError::Communication("connection refused".to_string()));
        }
        Ok(self.twins.get(device_id).cloned())
    }

    async fn create_device_with_twin(
        &self,
        device_id: &str,
        desired: &DesiredProperties,
    ) -> GatewayResult<BulkRegistryResult> {
        self.created
            .lock()
            .unwrap()
            .push((device_id.to_string(), desired.clone()));
        if self.reject_creates {
            return Ok(BulkRegistryResult::failure(vec![DeviceRegistryError {
                device_id: device_id.to_string(),
                error_code: "DeviceAlreadyExists".to_string(),
                error_status: "already registered".to_string(),
            }]));
        }
        Ok(BulkRegistryResult::success())
    }

    fn list_devices(
        &self,
        _page_size: usize,
        total_limit: Option<usize>,
    ) -> BoxStream<'_, GatewayResult<serde_json::Value>> {
        let records: Vec<_> = self
            .twins
            .keys()
            .map(|id| Ok(json!({ "deviceId": id })))
            .take(total_limit.unwrap_or(usize::MAX))
            .collect();
        stream::iter(records).boxed()
    }
}

const KEY_16: &str = "00112233445566778899AABBCCDDEEFF";

#[tokio::test]
async fn test_verify_valid_abp_twin() {
    let registry = ScriptedRegistry::default().with_twin(
        "dev-abp",
        json!({
            "AppEUI": KEY_16,
            "AppKey": KEY_16,
            "SensorDecoder": "http://decoders/api/lpp",
            "$version": 3
        }),
    );
    let checker = DeviceChecker::new(Arc::new(registry));

    let verification = checker.verify_device("dev-abp").await.unwrap();
    assert_eq!(verification.kind, ActivationKind::Abp);
    assert!(verification.is_valid(), "{:?}", verification.outcome.render());
}

#[tokio::test]
async fn test_verify_abp_key_with_wrong_length() {
    let registry = ScriptedRegistry::default().with_twin(
        "dev-abp",
        json!({
            "AppEUI": KEY_16,
            "AppKey": format!("{KEY_16}00"),
        }),
    );
    let checker = DeviceChecker::new(Arc::new(registry));

    let verification = checker.verify_device("dev-abp").await.unwrap();
    assert_eq!(verification.kind, ActivationKind::Abp);
    assert!(!verification.is_valid());
    let rendered = verification.outcome.render();
    assert!(rendered
        .iter()
        .any(|m| m.starts_with("Error: AppKey is invalid.") && m.contains("16 bytes")));
}

#[tokio::test]
async fn test_verify_mixed_twin_is_ambiguous() {
    let registry = ScriptedRegistry::default().with_twin(
        "dev-mixed",
        json!({ "AppEUI": KEY_16, "NwkSKey": KEY_16 }),
    );
    let checker = DeviceChecker::new(Arc::new(registry));

    let verification = checker.verify_device("dev-mixed").await.unwrap();
    assert_eq!(verification.kind, ActivationKind::Indeterminate);
    assert_eq!(verification.outcome.messages().len(), 1);
    assert!(matches!(
        verification.outcome.errors().next(),
        Some(ValidationError::AmbiguousConfiguration { .. })
    ));
}

#[tokio::test]
async fn test_verify_unknown_device() {
    let checker = DeviceChecker::new(Arc::new(ScriptedRegistry::default()));
    let err = checker.verify_device("missing").await.unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound { ref device_id } if device_id == "missing"));
}

#[tokio::test]
async fn test_gateway_failure_aborts_operation() {
    let registry = ScriptedRegistry {
        offline: true,
        ..Default::default()
    };
    let checker = DeviceChecker::new(Arc::new(registry));
    let err = checker.query_twin("dev").await.unwrap_err();
    assert!(matches!(err, Error::Gateway(GatewayError::Communication(_))));
}

#[tokio::test]
async fn test_provision_submits_once() {
    let registry = Arc::new(ScriptedRegistry::default());
    let checker = DeviceChecker::new(registry.clone());

    let report = checker
        .provision(ProvisioningRequest::otaa(
            DeviceCredentials::new().with(CredentialField::DevEui, "otaa-1"),
        ))
        .await
        .unwrap();

    assert!(report.is_success());
    let created = registry.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "otaa-1");
    assert!(created[0].1.contains_key("DevAddr"));
    assert_eq!(Some(&created[0].1), report.provisioning.payload.as_ref());
}

#[tokio::test]
async fn test_invalid_provision_is_not_submitted() {
    let registry = Arc::new(ScriptedRegistry::default());
    let checker = DeviceChecker::new(registry.clone());

    let report = checker
        .provision(ProvisioningRequest::abp(
            DeviceCredentials::new().with(CredentialField::ClassType, "B"),
        ))
        .await
        .unwrap();

    assert!(!report.is_success());
    assert!(report.registration.is_none());
    assert!(registry.created().is_empty());
}

#[tokio::test]
async fn test_rejected_registration_reports_device_errors() {
    let registry = Arc::new(ScriptedRegistry {
        reject_creates: true,
        ..Default::default()
    });
    let checker = DeviceChecker::new(registry.clone());

    let prepared = checker.provision_abp(DeviceCredentials::new());
    let result = checker.register(&prepared).await.unwrap().unwrap();
    assert!(!result.is_successful);
    assert_eq!(result.errors[0].error_code, "DeviceAlreadyExists");
    assert_eq!(registry.created().len(), 1);
}

#[tokio::test]
async fn test_list_devices_passes_through() {
    let registry = ScriptedRegistry::default()
        .with_twin("a", json!({}))
        .with_twin("b", json!({}))
        .with_twin("c", json!({}));
    let checker = DeviceChecker::new(Arc::new(registry));

    let records: Vec<_> = checker.list_devices(10, Some(2)).collect().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_ok()));
}
