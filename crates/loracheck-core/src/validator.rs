//! Credential field validation.
//!
//! Every check returns a [`ValidationOutcome`] fragment; callers merge the
//! fragments in field order. [`validate_credentials`] runs the full field
//! pipeline for one activation profile.

use crate::activation::{ActivationProfile, KeySpec};
use crate::credentials::{CredentialField, DeviceCredentials};
use crate::error::{HexKeyError, SensorDecoderError, ValidationError};
use crate::outcome::{Notice, ValidationOutcome};
use url::{Host, Url};

/// Path segment every URI sensor decoder must contain.
pub const DECODER_API_SEGMENT: &str = "/api/";

/// Check that `value` is exactly `expected_bytes` bytes of hex.
///
/// Rules are checked in order (empty, odd length, byte count, each
/// two-character chunk) and the first failure is returned.
pub fn validate_hex_key(value: &str, expected_bytes: usize) -> Result<(), HexKeyError> {
    let chars: Vec<char> = value.chars().collect();

    if chars.is_empty() {
        return Err(HexKeyError::Empty);
    }
    if chars.len() % 2 != 0 {
        return Err(HexKeyError::OddLength { len: chars.len() });
    }
    if chars.len() / 2 != expected_bytes {
        return Err(HexKeyError::ByteCount {
            expected: expected_bytes,
            actual: chars.len() / 2,
        });
    }
    for pair in chars.chunks(2) {
        if !pair.iter().all(|c| c.is_ascii_hexdigit()) {
            return Err(HexKeyError::InvalidByte {
                chunk: pair.iter().collect(),
            });
        }
    }

    Ok(())
}

/// Check one required hex key field of `credentials`.
///
/// Yields at most one error for the field.
pub fn validate_key_field(credentials: &DeviceCredentials, spec: KeySpec) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();
    match credentials.get(spec.field) {
        None => outcome.push_error(ValidationError::MissingField { field: spec.field }),
        Some(value) => match validate_hex_key(value, spec.bytes) {
            Ok(()) => outcome.push_info(Notice::FieldValid {
                field: spec.field,
                value: value.to_string(),
            }),
            Err(reason) => outcome.push_error(ValidationError::Format {
                field: spec.field,
                reason,
            }),
        },
    }
    outcome
}

/// Whether a decoder value is a URI reference rather than a bare decoder name.
fn is_uri_reference(value: &str) -> bool {
    value.starts_with("http") || value.contains('/')
}

/// Validate an optional sensor decoder reference.
///
/// Empty is valid with an informational note. Bare decoder names are accepted
/// as-is. URI references must parse as absolute URIs, spell their host in
/// lowercase and have `/api/` in the path; every violated rule is reported,
/// followed by a usage hint.
pub fn validate_sensor_decoder(value: Option<&str>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();

    let Some(decoder) = value.filter(|v| !v.is_empty()) else {
        outcome.push_info(Notice::NoSensorDecoder);
        return outcome;
    };

    if is_uri_reference(decoder) {
        match Url::parse(decoder) {
            Err(e) => outcome.push_error(
                SensorDecoderError::InvalidUri {
                    reason: e.to_string(),
                }
                .into(),
            ),
            Ok(uri) => {
                if let Some(host) = mixed_case_host(decoder, &uri) {
                    outcome.push_error(SensorDecoderError::UppercaseHost { host }.into());
                }
                if !uri.path().contains(DECODER_API_SEGMENT) {
                    outcome.push_error(SensorDecoderError::MissingApiSegment.into());
                }
            }
        }
    }

    if outcome.is_valid() {
        outcome.push_info(Notice::FieldValid {
            field: CredentialField::SensorDecoder,
            value: decoder.to_string(),
        });
    } else {
        outcome.push_info(Notice::SensorDecoderHint);
    }
    outcome
}

/// Host literal as written in `original` when it is not all lowercase.
///
/// The parser lowercases hosts of special schemes and stores them as
/// punycode; opaque hosts keep their case but are percent-encoded. The host
/// is decoded back to Unicode, and its lowercase form must then occur
/// verbatim in the original text. IP addresses have no case and are skipped.
fn mixed_case_host(original: &str, uri: &Url) -> Option<String> {
    let Some(Host::Domain(host)) = uri.host() else {
        return None;
    };
    let host = unicode_host(host);
    let lowered = host.to_lowercase();
    if original.contains(&lowered) {
        return None;
    }

    let literal = find_ignoring_case(original, &lowered).unwrap_or(&host);
    Some(literal.to_string())
}

/// Parsed host as it would have been typed.
fn unicode_host(host: &str) -> String {
    if host.contains('%') {
        if let Ok(decoded) = urlencoding::decode(host) {
            return decoded.into_owned();
        }
    }
    match idna::domain_to_unicode(host) {
        (unicode, Ok(())) => unicode,
        (_, Err(_)) => host.to_string(),
    }
}

/// First slice of `text` whose lowercase form equals `lowered`.
fn find_ignoring_case<'a>(text: &'a str, lowered: &str) -> Option<&'a str> {
    let width = lowered.chars().count();
    text.char_indices().find_map(|(start, _)| {
        let end = text[start..]
            .char_indices()
            .nth(width)
            .map_or(text.len(), |(offset, _)| start + offset);
        let candidate = &text[start..end];
        (candidate.to_lowercase() == lowered).then_some(candidate)
    })
}

/// Validate an optional class type: empty, or `C` in any case.
pub fn validate_class_type(value: Option<&str>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();
    match value.filter(|v| !v.is_empty()) {
        None => outcome.push_info(Notice::NoClassType),
        Some(class) if class.eq_ignore_ascii_case("C") => outcome.push_info(Notice::FieldValid {
            field: CredentialField::ClassType,
            value: class.to_string(),
        }),
        Some(class) => outcome.push_error(ValidationError::ClassType {
            value: class.to_string(),
        }),
    }
    outcome
}

/// Run every field check for `profile` and collect all messages.
///
/// Order: device identifier, the profile's keys, sensor decoder, class type.
/// The device identifier only has to be present; its format is left to the
/// caller.
pub fn validate_credentials(
    profile: &ActivationProfile,
    credentials: &DeviceCredentials,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();

    if !credentials.has(CredentialField::DevEui) {
        outcome.push_error(ValidationError::MissingField {
            field: CredentialField::DevEui,
        });
    }

    for spec in profile.keys {
        outcome.merge(validate_key_field(credentials, *spec));
    }

    outcome.merge(validate_sensor_decoder(
        credentials.get(CredentialField::SensorDecoder),
    ));
    outcome.merge(validate_class_type(credentials.get(CredentialField::ClassType)));

    outcome
}
