//! Field format and length validators.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest accepted email address, in characters.
pub const EMAIL_MIN_LEN: usize = 5;
/// Longest accepted email address, in characters.
pub const EMAIL_MAX_LEN: usize = 100;

/// `local-part@domain.tld` with a restricted local-part alphabet and a
/// letters-only TLD of at least two characters.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Check an email address.
///
/// Rejects lengths outside `[5, 100]`, consecutive dots, and a leading or
/// trailing dot before matching the address pattern. Surrounding whitespace
/// is not trimmed, so `" a@b.co"` is rejected.
///
/// # Example
/// ```
/// use form_guard::validate_email;
///
/// assert!(validate_email("a@b.co"));
/// assert!(!validate_email("a..b@c.com"));
/// assert!(!validate_email("@b.com"));
/// ```
pub fn validate_email(value: &str) -> bool {
    let len = value.chars().count();
    if !(EMAIL_MIN_LEN..=EMAIL_MAX_LEN).contains(&len) {
        return false;
    }
    if value.contains("..") || value.starts_with('.') || value.ends_with('.') {
        return false;
    }
    EMAIL_RE.is_match(value)
}

/// Check that the trimmed value has between `min` and `max` characters,
/// both inclusive.
pub fn validate_length(value: &str, min: usize, max: usize) -> bool {
    let len = value.trim().chars().count();
    len >= min && len <= max
}
