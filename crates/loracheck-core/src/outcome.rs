//! Aggregated validation results.

use crate::credentials::CredentialField;
use crate::error::ValidationError;
use std::fmt;

/// Usage example appended after a rejected sensor decoder reference.
pub const SENSOR_DECODER_HINT: &str =
    "Make sure the URI based SensorDecoder Twin desired property looks like \"http://containername/api/decodername\".";

/// Severity of a [`ValidationMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Informational notes produced alongside field checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The field passed its checks.
    FieldValid { field: CredentialField, value: String },
    /// No sensor decoder configured; payloads will not be decoded.
    NoSensorDecoder,
    /// No class type configured.
    NoClassType,
    /// Usage example for URI decoder references.
    SensorDecoderHint,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldValid { field, value } => write!(f, "{} is valid: {}", field, value),
            Self::NoSensorDecoder => {
                f.write_str("SensorDecoder is empty. No decoder will be used.")
            }
            Self::NoClassType => f.write_str("ClassType is empty."),
            Self::SensorDecoderHint => f.write_str(SENSOR_DECODER_HINT),
        }
    }
}

/// One entry of a [`ValidationOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMessage {
    Info(Notice),
    Error(ValidationError),
}

impl ValidationMessage {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Info(_) => Severity::Info,
            Self::Error(_) => Severity::Error,
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(Notice::SensorDecoderHint) => write!(f, "Hint: {}", SENSOR_DECODER_HINT),
            Self::Info(notice) => write!(f, "Info: {}", notice),
            Self::Error(err) => write!(f, "Error: {}", err),
        }
    }
}

/// Ordered validation messages for one credential set.
///
/// Valid exactly when no error-level message was recorded; an empty outcome
/// is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    messages: Vec<ValidationMessage>,
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome holding a single error.
    pub fn failed(error: ValidationError) -> Self {
        let mut outcome = Self::new();
        outcome.push_error(error);
        outcome
    }

    pub fn is_valid(&self) -> bool {
        !self.messages.iter().any(|m| m.severity() == Severity::Error)
    }

    pub fn push_info(&mut self, notice: Notice) {
        self.messages.push(ValidationMessage::Info(notice));
    }

    pub fn push_error(&mut self, error: ValidationError) {
        self.messages.push(ValidationMessage::Error(error));
    }

    /// Append every message of `other`, keeping order.
    pub fn merge(&mut self, other: ValidationOutcome) {
        self.messages.extend(other.messages);
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.messages.iter().filter_map(|m| match m {
            ValidationMessage::Error(e) => Some(e),
            ValidationMessage::Info(_) => None,
        })
    }

    /// Messages rendered as text, in order.
    pub fn render(&self) -> Vec<String> {
        self.messages.iter().map(ToString::to_string).collect()
    }
}
