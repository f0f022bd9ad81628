//! Device credential data model.
//!
//! A [`DeviceCredentials`] value is the superset of every field a LoRaWAN
//! device twin may carry in its desired properties. It is either read from the
//! registry (and only verified) or built from operator input, then passed
//! through the provisioning pipeline one stage at a time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Desired-property keys reserved by the registry for bookkeeping.
pub const TWIN_METADATA_KEYS: [&str; 2] = ["$metadata", "$version"];

/// A single credential field.
///
/// The twin key spelling (see [`CredentialField::twin_key`]) is part of the
/// registry schema and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialField {
    DevEui,
    AppEui,
    AppKey,
    NwkSKey,
    AppSKey,
    DevAddr,
    GatewayId,
    SensorDecoder,
    ClassType,
}

impl CredentialField {
    /// Key used for this field in the twin's desired properties.
    pub fn twin_key(&self) -> &'static str {
        match self {
            Self::DevEui => "DevEUI",
            Self::AppEui => "AppEUI",
            Self::AppKey => "AppKey",
            Self::NwkSKey => "NwkSKey",
            Self::AppSKey => "AppSKey",
            Self::DevAddr => "DevAddr",
            Self::GatewayId => "GatewayID",
            Self::SensorDecoder => "SensorDecoder",
            Self::ClassType => "ClassType",
        }
    }

    /// Expected key length in bytes for fields that are generated when missing.
    pub fn key_bytes(&self) -> Option<usize> {
        match self {
            Self::DevEui | Self::AppEui | Self::AppKey | Self::NwkSKey | Self::AppSKey => Some(16),
            Self::DevAddr => Some(4),
            Self::GatewayId | Self::SensorDecoder | Self::ClassType => None,
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.twin_key())
    }
}

/// Full set of LoRaWAN credential fields for one device.
///
/// Absent and empty are treated alike everywhere: use [`DeviceCredentials::get`]
/// to read a field, which never returns an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCredentials {
    pub dev_eui: Option<String>,
    pub app_eui: Option<String>,
    pub app_key: Option<String>,
    pub nwk_s_key: Option<String>,
    pub app_s_key: Option<String>,
    pub dev_addr: Option<String>,
    pub gateway_id: Option<String>,
    pub sensor_decoder: Option<String>,
    pub class_type: Option<String>,
}

impl DeviceCredentials {
    /// Every field, in check order.
    pub const FIELDS: [CredentialField; 9] = [
        CredentialField::DevEui,
        CredentialField::AppEui,
        CredentialField::AppKey,
        CredentialField::NwkSKey,
        CredentialField::AppSKey,
        CredentialField::DevAddr,
        CredentialField::GatewayId,
        CredentialField::SensorDecoder,
        CredentialField::ClassType,
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Build credentials from a twin's desired properties.
    ///
    /// Keys are matched exactly. Non-string scalars are rendered to text and
    /// `null` is treated as absent.
    pub fn from_twin(device_id: impl Into<String>, twin: &TwinDocument) -> Self {
        let mut credentials = Self::new().with(CredentialField::DevEui, device_id.into());
        for field in Self::FIELDS.iter().skip(1) {
            if let Some(value) = twin.get(field.twin_key()).and_then(value_as_text) {
                credentials = credentials.with(*field, value);
            }
        }
        credentials
    }

    /// Value of `field`, or `None` when absent or empty.
    pub fn get(&self, field: CredentialField) -> Option<&str> {
        self.slot(field).as_deref().filter(|v| !v.is_empty())
    }

    /// Whether `field` holds a non-empty value.
    pub fn has(&self, field: CredentialField) -> bool {
        self.get(field).is_some()
    }

    /// Return a copy with `field` set to `value`.
    pub fn with(mut self, field: CredentialField, value: impl Into<String>) -> Self {
        *self.slot_mut(field) = Some(value.into());
        self
    }

    /// Return a copy with `field` replaced by `value` (which may be absent).
    pub fn with_opt(mut self, field: CredentialField, value: Option<String>) -> Self {
        *self.slot_mut(field) = value;
        self
    }

    fn slot(&self, field: CredentialField) -> &Option<String> {
        match field {
            CredentialField::DevEui => &self.dev_eui,
            CredentialField::AppEui => &self.app_eui,
            CredentialField::AppKey => &self.app_key,
            CredentialField::NwkSKey => &self.nwk_s_key,
            CredentialField::AppSKey => &self.app_s_key,
            CredentialField::DevAddr => &self.dev_addr,
            CredentialField::GatewayId => &self.gateway_id,
            CredentialField::SensorDecoder => &self.sensor_decoder,
            CredentialField::ClassType => &self.class_type,
        }
    }

    fn slot_mut(&mut self, field: CredentialField) -> &mut Option<String> {
        match field {
            CredentialField::DevEui => &mut self.dev_eui,
            CredentialField::AppEui => &mut self.app_eui,
            CredentialField::AppKey => &mut self.app_key,
            CredentialField::NwkSKey => &mut self.nwk_s_key,
            CredentialField::AppSKey => &mut self.app_s_key,
            CredentialField::DevAddr => &mut self.dev_addr,
            CredentialField::GatewayId => &mut self.gateway_id,
            CredentialField::SensorDecoder => &mut self.sensor_decoder,
            CredentialField::ClassType => &mut self.class_type,
        }
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Desired properties of a device twin as returned by the registry, with the
/// registry bookkeeping keys already removed.
pub type TwinDocument = Map<String, Value>;

/// Strip the `$metadata` and `$version` entries from a raw desired-properties object.
pub fn strip_twin_metadata(mut desired: Map<String, Value>) -> TwinDocument {
    for key in TWIN_METADATA_KEYS {
        desired.remove(key);
    }
    desired
}

/// Flat string-keyed desired-property payload submitted when creating a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredProperties(BTreeMap<String, String>);

impl DesiredProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: CredentialField, value: impl Into<String>) {
        self.0.insert(field.twin_key().to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON object, the shape the registry stores.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}
