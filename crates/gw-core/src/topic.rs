//! Topic segment helpers

/// Characters that cannot appear inside a single topic segment
const ILLEGAL: [char; 3] = ['/', '+', '#'];

/// Trim a device id or name and strip characters that would break topic routing
pub fn normalize_segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && !c.is_control())
        .collect()
}

/// Check that a value can be used verbatim as a topic segment
pub fn is_valid_segment(value: &str) -> bool {
    !value.is_empty() && normalize_segment(value) == value
}
