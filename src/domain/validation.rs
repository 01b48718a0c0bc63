//! Contact form validation.
//!
//! Each field is checked with a fixed rule order and only the first failing
//! rule is reported:
//!
//! ```text
//! name     length(sanitized) → xss(raw)
//! email    format(raw)
//! subject  length(sanitized) → xss(raw)
//! message  length(sanitized) → xss(raw) → links(raw) → keywords(raw)
//! ```
//!
//! The sanitized record is always produced, valid or not.

use crate::domain::heuristics::{HeuristicRules, DEFAULT_MAX_URLS};
use crate::domain::policy::ConfigError;
use crate::domain::sanitizer::sanitize_input;
use crate::domain::submission::{Field, SanitizedSubmission, Submission};
use crate::domain::validators::{validate_email, validate_length};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Sanitized length outside the allowed range
    Length {
        /// Minimum characters
        min: usize,
        /// Maximum characters
        max: usize,
    },
    /// Email address does not have an accepted shape
    InvalidEmail,
    /// Raw input matched an XSS pattern
    ForbiddenContent,
    /// Message has more links than allowed
    TooManyLinks,
    /// Message contains a spam phrase
    SuspiciousContent,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Length { min, max } => {
                write!(f, "must be between {} and {} characters", min, max)
            }
            FieldError::InvalidEmail => write!(f, "must be a valid email address"),
            FieldError::ForbiddenContent => write!(f, "contains characters that are not allowed"),
            FieldError::TooManyLinks => write!(f, "contains too many links"),
            FieldError::SuspiciousContent => write!(f, "contains suspicious content"),
        }
    }
}

/// Inclusive character-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Per-field limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    pub name: LengthBounds,
    pub subject: LengthBounds,
    pub message: LengthBounds,
    /// Links allowed in the message before it is treated as spam
    pub max_urls: usize,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            name: LengthBounds::new(2, 100),
            subject: LengthBounds::new(3, 200),
            message: LengthBounds::new(10, 2000),
            max_urls: DEFAULT_MAX_URLS,
        }
    }
}

impl FieldRules {
    /// Check that every range is well-formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, bounds) in [
            (Field::Name, self.name),
            (Field::Subject, self.subject),
            (Field::Message, self.message),
        ] {
            if bounds.min > bounds.max {
                return Err(ConfigError::InvalidLengthBounds {
                    field: field.as_str(),
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of validating one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// First failing rule per field; empty when the submission is valid
    pub errors: BTreeMap<Field, FieldError>,
    /// Sanitized copy of the submission, produced even when invalid
    pub sanitized: SanitizedSubmission,
}

impl ValidationResult {
    /// Whether no field produced an error.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error for one field.
    pub fn error(&self, field: Field) -> Option<FieldError> {
        self.errors.get(&field).copied()
    }

    /// User-facing message for one field, e.g. "Name must be between 2 and 100 characters".
    pub fn message(&self, field: Field) -> Option<String> {
        self.error(field)
            .map(|error| format!("{} {}", field.label(), error))
    }

    /// All user-facing messages keyed by field.
    pub fn messages(&self) -> BTreeMap<Field, String> {
        self.errors
            .iter()
            .map(|(field, error)| (*field, format!("{} {}", field.label(), error)))
            .collect()
    }
}

/// Validator bound to a heuristic rule table and field limits.
#[derive(Debug, Clone, Default)]
pub struct ContactFormValidator {
    heuristics: HeuristicRules,
    fields: FieldRules,
}

impl ContactFormValidator {
    /// Create a validator.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidLengthBounds` if any range is inverted.
    pub fn new(heuristics: HeuristicRules, fields: FieldRules) -> Result<Self, ConfigError> {
        fields.validate()?;
        Ok(Self { heuristics, fields })
    }

    /// Heuristic tables in use.
    pub fn heuristics(&self) -> &HeuristicRules {
        &self.heuristics
    }

    /// Field limits in use.
    pub fn field_rules(&self) -> &FieldRules {
        &self.fields
    }

    /// Validate and sanitize a submission.
    pub fn validate(&self, submission: &Submission) -> ValidationResult {
        let mut errors = BTreeMap::new();

        let name = sanitize_input(&submission.name);
        if let Some(error) = self.check_text(&name, &submission.name, self.fields.name) {
            errors.insert(Field::Name, error);
        }

        if !validate_email(&submission.email) {
            errors.insert(Field::Email, FieldError::InvalidEmail);
        }

        let subject = sanitize_input(&submission.subject);
        if let Some(error) = self.check_text(&subject, &submission.subject, self.fields.subject) {
            errors.insert(Field::Subject, error);
        }

        let message = sanitize_input(&submission.message);
        if let Some(error) = self
            .check_text(&message, &submission.message, self.fields.message)
            .or_else(|| self.check_message_content(&submission.message))
        {
            errors.insert(Field::Message, error);
        }

        ValidationResult {
            errors,
            sanitized: SanitizedSubmission {
                name,
                email: submission.email.to_lowercase().trim().to_string(),
                subject,
                message,
            },
        }
    }

    fn check_text(&self, sanitized: &str, raw: &str, bounds: LengthBounds) -> Option<FieldError> {
        if !validate_length(sanitized, bounds.min, bounds.max) {
            Some(FieldError::Length {
                min: bounds.min,
                max: bounds.max,
            })
        } else if self.heuristics.detect_xss(raw) {
            Some(FieldError::ForbiddenContent)
        } else {
            None
        }
    }

    fn check_message_content(&self, raw: &str) -> Option<FieldError> {
        if self.heuristics.detect_spam(raw, self.fields.max_urls) {
            Some(FieldError::TooManyLinks)
        } else if self.heuristics.detect_suspicious_content(raw) {
            Some(FieldError::SuspiciousContent)
        } else {
            None
        }
    }
}

static DEFAULT_VALIDATOR: Lazy<ContactFormValidator> = Lazy::new(ContactFormValidator::default);

/// Validate a submission with the built-in rules and limits.
///
/// # Example
/// ```
/// use form_guard::{validate_contact_form, Field, Submission};
///
/// let result = validate_contact_form(&Submission::new("Jo", " JO@X.COM", "Hi there", "short"));
///
/// assert!(!result.is_valid());
/// assert!(result.error(Field::Message).is_some());
/// assert_eq!(result.sanitized.email, "jo@x.com");
/// ```
pub fn validate_contact_form(submission: &Submission) -> ValidationResult {
    DEFAULT_VALIDATOR.validate(submission)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submission() -> Submission {
        Submission::new(
            "María Pérez",
            "maria@example.com",
            "Quote request",
            "We would like a quote for 200 steel brackets.",
        )
    }

    #[test]
    fn test_valid_submission() {
        let result = validate_contact_form(&valid_submission());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.sanitized.name, "María Pérez");
    }

    #[test]
    fn test_only_message_fails_when_too_short() {
        let result =
            validate_contact_form(&Submission::new("Jo", "jo@x.com", "Hi there", "short"));

        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.error(Field::Message),
            Some(FieldError::Length { min: 10, max: 2000 })
        );
        assert_eq!(result.sanitized.email, "jo@x.com");
    }

    #[test]
    fn test_email_is_normalized_even_when_invalid() {
        let mut submission = valid_submission();
        submission.email = "  Maria@Example.COM ".to_string();

        let result = validate_contact_form(&submission);

        // raw value has surrounding spaces, so the format check fails
        assert_eq!(result.error(Field::Email), Some(FieldError::InvalidEmail));
        assert_eq!(result.sanitized.email, "maria@example.com");
    }

    #[test]
    fn test_length_reported_before_xss() {
        let mut submission = valid_submission();
        submission.name = "<script>alert(1)</script>".to_string();

        let result = validate_contact_form(&submission);
        // sanitized name is empty, so the length rule fires first
        assert_eq!(
            result.error(Field::Name),
            Some(FieldError::Length { min: 2, max: 100 })
        );
    }

    #[test]
    fn test_xss_reported_when_length_passes() {
        let mut submission = valid_submission();
        submission.name = "Juan <img src=x onerror=alert(1)>".to_string();
        submission.subject = "Pricing javascript:void(0)".to_string();

        let result = validate_contact_form(&submission);
        assert_eq!(result.error(Field::Name), Some(FieldError::ForbiddenContent));
        assert_eq!(result.error(Field::Subject), Some(FieldError::ForbiddenContent));
        assert_eq!(result.sanitized.name, "Juan");
    }

    #[test]
    fn test_message_rule_precedence() {
        let mut submission = valid_submission();

        // xss wins over links and keywords
        submission.message =
            "casino http://a.io http://b.io http://c.io <iframe src=x>".to_string();
        assert_eq!(
            validate_contact_form(&submission).error(Field::Message),
            Some(FieldError::ForbiddenContent)
        );

        // links win over keywords
        submission.message = "casino http://a.io http://b.io http://c.io".to_string();
        assert_eq!(
            validate_contact_form(&submission).error(Field::Message),
            Some(FieldError::TooManyLinks)
        );

        submission.message = "Buy now and get the best casino deals".to_string();
        assert_eq!(
            validate_contact_form(&submission).error(Field::Message),
            Some(FieldError::SuspiciousContent)
        );

        submission.message = "See http://a.io and http://b.io for drawings".to_string();
        assert_eq!(validate_contact_form(&submission).error(Field::Message), None);
    }

    #[test]
    fn test_all_fields_can_fail_independently() {
        let result = validate_contact_form(&Submission::new("J", "nope", "Hi", "tiny"));
        assert_eq!(result.errors.len(), 4);
        assert_eq!(
            result.message(Field::Subject).as_deref(),
            Some("Subject must be between 3 and 200 characters")
        );
        assert_eq!(
            result.message(Field::Email).as_deref(),
            Some("Email must be a valid email address")
        );
    }

    #[test]
    fn test_sanitized_text_has_markup_removed() {
        let mut submission = valid_submission();
        submission.message = "<b>Hello</b>, we need <i>forty</i> units".to_string();

        let result = validate_contact_form(&submission);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.sanitized.message, "Hello, we need forty units");
    }

    #[test]
    fn test_custom_field_rules() {
        let rules = FieldRules {
            max_urls: 0,
            ..FieldRules::default()
        };
        let validator = ContactFormValidator::new(HeuristicRules::default(), rules).unwrap();

        let mut submission = valid_submission();
        submission.message = "Catalogue at https://example.com please".to_string();
        assert_eq!(
            validator.validate(&submission).error(Field::Message),
            Some(FieldError::TooManyLinks)
        );
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let rules = FieldRules {
            subject: LengthBounds::new(10, 5),
            ..FieldRules::default()
        };
        assert_eq!(
            ContactFormValidator::new(HeuristicRules::default(), rules).unwrap_err(),
            ConfigError::InvalidLengthBounds {
                field: "subject",
                min: 10,
                max: 5
            }
        );
    }
}
