//! Activation-kind detection for existing twins.

use crate::activation::{ActivationKind, ABP, OTAA};
use crate::credentials::DeviceCredentials;
use crate::error::ValidationError;
use crate::outcome::ValidationOutcome;
use crate::validator::validate_credentials;
use tracing::debug;

/// Decide whether `credentials` describe an ABP device, an OTAA device, or
/// neither.
///
/// Any populated ABP key is an ABP signal and any populated OTAA key is an
/// OTAA signal. Exactly one signal selects that mode; both or none is
/// [`ActivationKind::Indeterminate`].
pub fn classify(credentials: &DeviceCredentials) -> ActivationKind {
    let (abp, otaa) = signals(credentials);
    match (abp, otaa) {
        (true, false) => ActivationKind::Abp,
        (false, true) => ActivationKind::Otaa,
        _ => ActivationKind::Indeterminate,
    }
}

fn signals(credentials: &DeviceCredentials) -> (bool, bool) {
    let abp = ABP.keys.iter().any(|k| credentials.has(k.field));
    let otaa = OTAA.keys.iter().any(|k| credentials.has(k.field));
    (abp, otaa)
}

/// Classify and validate an existing credential set.
///
/// An indeterminate set fails immediately with a single ambiguity error and
/// no field checks are run.
pub fn verify_existing(credentials: &DeviceCredentials) -> (ActivationKind, ValidationOutcome) {
    let kind = classify(credentials);
    debug!(kind = %kind, "Classified device configuration");

    let outcome = match kind.mode() {
        Some(mode) => validate_credentials(mode.profile(), credentials),
        None => {
            let (abp_signal, otaa_signal) = signals(credentials);
            ValidationOutcome::failed(ValidationError::AmbiguousConfiguration {
                abp_signal,
                otaa_signal,
            })
        }
    };
    (kind, outcome)
}
