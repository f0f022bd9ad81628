//! LoRaWAN device credential checks and twin provisioning.
//!
//! This crate validates the desired properties of LoRaWAN device twins and
//! assembles new twins for devices activated by personalization (ABP) or over
//! the air (OTAA).
//!
//! ## Architecture
//!
//! - **keygen / sanitize**: key material generation and free-text cleanup
//! - **validator**: hex key, sensor decoder and class type checks
//! - **classifier**: ABP / OTAA / indeterminate detection for existing twins
//! - **provisioning**: backfill, sanitize, validate and payload assembly
//! - **DeviceChecker**: the same operations on top of a [`RegistryGateway`]
//!
//! Everything except [`DeviceChecker`] is synchronous and performs no I/O.
//!
//! ## Example
//!
//! ```rust
//! use loracheck_core::{CredentialField, DeviceCredentials, provisioning};
//!
//! let prepared = provisioning::prepare_abp(
//!     DeviceCredentials::new().with(CredentialField::ClassType, "C"),
//! );
//! assert!(prepared.is_valid());
//! assert!(prepared.payload.unwrap().contains_key("AppEUI"));
//! ```

pub mod activation;
pub mod classifier;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod keygen;
pub mod outcome;
pub mod provisioning;
pub mod sanitize;
pub mod service;
pub mod validator;

pub use activation::{ActivationKind, ActivationMode, ActivationProfile, KeySpec, ABP, OTAA};
pub use classifier::{classify, verify_existing};
pub use credentials::{
    strip_twin_metadata, CredentialField, DesiredProperties, DeviceCredentials, TwinDocument,
};
pub use error::{Error, GatewayError, HexKeyError, Result, SensorDecoderError, ValidationError};
pub use gateway::{BulkRegistryResult, DeviceRegistryError, GatewayResult, RegistryGateway};
pub use outcome::{Notice, Severity, ValidationMessage, ValidationOutcome};
pub use provisioning::{Provisioning, ProvisioningRequest};
pub use service::{DeviceChecker, DeviceVerification, ProvisionReport};
pub use validator::{validate_class_type, validate_hex_key, validate_sensor_decoder};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
