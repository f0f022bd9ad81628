//! Error types for device credential checks and registry access.
//!
//! Validation failures ([`ValidationError`]) are never returned as `Err`: they
//! are collected into a [`ValidationOutcome`](crate::ValidationOutcome) and
//! reported to the caller. Only registry problems and lookups of unknown
//! devices surface as [`Error`].

use crate::credentials::CredentialField;

/// Why a hexadecimal key was rejected. Only the first failing rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexKeyError {
    #[error("Hex string is empty")]
    Empty,

    #[error("Hex string must contain an even number of characters")]
    OddLength { len: usize },

    #[error("Hex string doesn't contain the expected number of {expected} bytes (found {actual})")]
    ByteCount { expected: usize, actual: usize },

    #[error("Hex string contains invalid byte {chunk}")]
    InvalidByte { chunk: String },
}

/// Sensor decoder URI rule violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorDecoderError {
    #[error("SensorDecoder has invalid URL: {reason}")]
    InvalidUri { reason: String },

    #[error("SensorDecoder Hostname must be all lowercase (found \"{host}\")")]
    UppercaseHost { host: String },

    #[error("SensorDecoder is missing \"api\" keyword")]
    MissingApiSegment,
}

/// A single credential validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is invalid. {reason}")]
    Format {
        field: CredentialField,
        reason: HexKeyError,
    },

    #[error("{field} is missing")]
    MissingField { field: CredentialField },

    #[error("Ambiguous configuration: {}", ambiguity(*abp_signal))]
    AmbiguousConfiguration { abp_signal: bool, otaa_signal: bool },

    #[error(transparent)]
    SensorDecoderFormat(#[from] SensorDecoderError),

    #[error("If ClassType is set, it needs to be \"C\" (found \"{value}\")")]
    ClassType { value: String },
}

fn ambiguity(both: bool) -> &'static str {
    if both {
        "can't determine if OTAA or ABP device, fields of both activation modes are set"
    } else {
        "can't determine if OTAA or ABP device, no activation fields are set"
    }
}

impl ValidationError {
    /// Error code for client handling.
    pub fn code(&self) -> &str {
        match self {
            Self::Format { .. } => "FORMAT_ERROR",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::AmbiguousConfiguration { .. } => "AMBIGUOUS_CONFIGURATION",
            Self::SensorDecoderFormat(_) => "SENSOR_DECODER_FORMAT",
            Self::ClassType { .. } => "CLASS_TYPE",
        }
    }

    /// Field the failure refers to, if any.
    pub fn field(&self) -> Option<CredentialField> {
        match self {
            Self::Format { field, .. } | Self::MissingField { field } => Some(*field),
            Self::AmbiguousConfiguration { .. } => None,
            Self::SensorDecoderFormat(_) => Some(CredentialField::SensorDecoder),
            Self::ClassType { .. } => Some(CredentialField::ClassType),
        }
    }
}

/// Failure talking to the device registry.
///
/// Opaque to the checks themselves: the current operation is aborted and
/// nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Registry returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn code(&self) -> &str {
        match self {
            Self::Communication(_) => "COMMUNICATION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Throttled(_) => "THROTTLED",
            Self::Http { .. } => "HTTP",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Configuration(_) => "CONFIGURATION",
        }
    }
}

/// Errors returned by [`DeviceChecker`](crate::DeviceChecker) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not get data for device {device_id}")]
    DeviceNotFound { device_id: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Result type for registry-backed operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_field_and_rule() {
        let err = ValidationError::Format {
            field: CredentialField::AppKey,
            reason: HexKeyError::ByteCount {
                expected: 16,
                actual: 17,
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("AppKey is invalid."));
        assert!(msg.contains("16 bytes"));
        assert_eq!(err.code(), "FORMAT_ERROR");
        assert_eq!(err.field(), Some(CredentialField::AppKey));
    }

    #[test]
    fn test_ambiguous_message_depends_on_signals() {
        let both = ValidationError::AmbiguousConfiguration {
            abp_signal: true,
            otaa_signal: true,
        };
        let neither = ValidationError::AmbiguousConfiguration {
            abp_signal: false,
            otaa_signal: false,
        };
        assert!(both.to_string().contains("both"));
        assert!(neither.to_string().contains("no activation fields"));
        assert_eq!(both.field(), None);
    }

    #[test]
    fn test_sensor_decoder_error_is_transparent() {
        let err: ValidationError = SensorDecoderError::MissingApiSegment.into();
        assert_eq!(err.to_string(), "SensorDecoder is missing \"api\" keyword");
        assert_eq!(err.field(), Some(CredentialField::SensorDecoder));
    }

    #[test]
    fn test_gateway_error_converts() {
        let err: Error = GatewayError::Throttled("slow down".to_string()).into();
        assert!(err.to_string().contains("slow down"));
    }
}
