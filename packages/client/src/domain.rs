//! Domain logic for client-side operations.
//!
//! Pure functions without side effects, kept apart so they are easy to test.

use relaychat_shared::ANONYMOUS_SENDER;

/// Turn raw name input into a display name.
///
/// Surrounding whitespace is dropped; empty input falls back to a placeholder.
pub fn resolve_display_name(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_SENDER.to_string(),
    }
}

/// Content to send for one line of input, or `None` if the line is blank
pub fn outgoing_content(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
