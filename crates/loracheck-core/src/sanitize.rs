//! Free-text field cleanup.

/// Character that would corrupt a downstream storage payload.
const FORBIDDEN: char = '\'';

/// Remove every apostrophe from `text`.
///
/// Absent or empty input maps to `None`, and so does input made only of
/// apostrophes. Idempotent and never lengthens the input.
pub fn clean(text: Option<&str>) -> Option<String> {
    let cleaned = text?.replace(FORBIDDEN, "");
    (!cleaned.is_empty()).then_some(cleaned)
}
