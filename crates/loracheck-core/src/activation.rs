//! LoRaWAN activation modes and the field layout each one requires.

use crate::credentials::CredentialField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activation mode chosen by the caller when provisioning a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    Abp,
    Otaa,
}

impl ActivationMode {
    pub fn profile(self) -> &'static ActivationProfile {
        match self {
            Self::Abp => &ABP,
            Self::Otaa => &OTAA,
        }
    }
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().label)
    }
}

/// Activation kind derived from an existing twin. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    Abp,
    Otaa,
    Indeterminate,
}

impl ActivationKind {
    /// Mode to validate against, `None` when indeterminate.
    pub fn mode(self) -> Option<ActivationMode> {
        match self {
            Self::Abp => Some(ActivationMode::Abp),
            Self::Otaa => Some(ActivationMode::Otaa),
            Self::Indeterminate => None,
        }
    }
}

impl From<ActivationMode> for ActivationKind {
    fn from(mode: ActivationMode) -> Self {
        match mode {
            ActivationMode::Abp => Self::Abp,
            ActivationMode::Otaa => Self::Otaa,
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode() {
            Some(mode) => mode.fmt(f),
            None => f.write_str("indeterminate"),
        }
    }
}

/// Hex key field with its required length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    pub field: CredentialField,
    pub bytes: usize,
}

/// Describes one activation mode: which hex keys it requires, in check order.
#[derive(Debug, PartialEq, Eq)]
pub struct ActivationProfile {
    pub mode: ActivationMode,
    pub label: &'static str,
    pub keys: &'static [KeySpec],
}

impl ActivationProfile {
    /// Fields generated when left blank: the device identifier, then the keys.
    pub fn backfill_fields(&self) -> impl Iterator<Item = KeySpec> + '_ {
        std::iter::once(KeySpec {
            field: CredentialField::DevEui,
            bytes: 16,
        })
        .chain(self.keys.iter().copied())
    }

    /// Whether `field` is one of this mode's key fields.
    pub fn requires(&self, field: CredentialField) -> bool {
        self.keys.iter().any(|k| k.field == field)
    }
}

pub static ABP: ActivationProfile = ActivationProfile {
    mode: ActivationMode::Abp,
    label: "ABP",
    keys: &[
        KeySpec {
            field: CredentialField::AppEui,
            bytes: 16,
        },
        KeySpec {
            field: CredentialField::AppKey,
            bytes: 16,
        },
    ],
};

pub static OTAA: ActivationProfile = ActivationProfile {
    mode: ActivationMode::Otaa,
    label: "OTAA",
    keys: &[
        KeySpec {
            field: CredentialField::NwkSKey,
            bytes: 16,
        },
        KeySpec {
            field: CredentialField::AppSKey,
            bytes: 16,
        },
        KeySpec {
            field: CredentialField::DevAddr,
            bytes: 4,
        },
    ],
};
