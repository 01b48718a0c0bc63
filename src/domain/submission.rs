//! Contact form submission records.
//!
//! A `Submission` is what the UI hands over: four free-text fields plus the
//! honeypot. Values decoded from JSON are lenient: anything that is not a
//! string becomes an empty string instead of a decoding error, so a hostile
//! or broken client degrades to "empty field" and fails validation normally.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The user-visible fields of the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Sender name
    Name,
    /// Reply address
    Email,
    /// Subject line
    Subject,
    /// Message body
    Message,
}

impl Field {
    /// All fields in form order.
    pub const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Subject, Field::Message];

    /// Wire name of the field (`"name"`, `"email"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Subject => "subject",
            Field::Message => "message",
        }
    }

    /// Human-readable label used to prefix error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Subject => "Subject",
            Field::Message => "Message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw form contents as typed by the user (or a bot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
    /// Decoy field; legitimate users never see it.
    #[serde(default, alias = "website", deserialize_with = "lenient_text")]
    pub honeypot: String,
}

impl Submission {
    /// Create a submission with an empty honeypot.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
            honeypot: String::new(),
        }
    }

    /// Set the honeypot value.
    pub fn with_honeypot(mut self, value: impl Into<String>) -> Self {
        self.honeypot = value.into();
        self
    }

    /// Decode a submission from JSON, tolerating non-string field values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a field value.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Subject => &self.subject,
            Field::Message => &self.message,
        }
    }

    /// Replace a field value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Subject => &mut self.subject,
            Field::Message => &mut self.message,
        };
        *slot = value.into();
    }

    /// Reset every field, honeypot included.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Submission after sanitization: markup stripped from the free-text fields
/// and the email lower-cased and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseText::deserialize(deserializer)? {
        LooseText::Text(text) => text,
        LooseText::Other(_) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_accepts_strings() {
        let submission = Submission::from_json(
            r#"{"name":"Ana","email":"ana@example.com","subject":"Quote","message":"Need parts","website":""}"#,
        )
        .unwrap();

        assert_eq!(submission.name, "Ana");
        assert_eq!(submission.email, "ana@example.com");
        assert_eq!(submission.honeypot, "");
    }

    #[test]
    fn test_non_string_values_become_empty() {
        let submission = Submission::from_json(
            r#"{"name":42,"email":null,"subject":["x"],"message":{"a":1},"honeypot":true}"#,
        )
        .unwrap();

        assert_eq!(submission, Submission::default());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let submission = Submission::from_json(r#"{"name":"Ana"}"#).unwrap();
        assert_eq!(submission.name, "Ana");
        assert_eq!(submission.message, "");
    }

    #[test]
    fn test_get_set_clear() {
        let mut submission = Submission::default();
        submission.set(Field::Subject, "Hello");
        assert_eq!(submission.get(Field::Subject), "Hello");

        submission.clear();
        assert_eq!(submission.get(Field::Subject), "");
    }

    #[test]
    fn test_field_names() {
        let names: Vec<_> = Field::ALL.iter().map(Field::as_str).collect();
        assert_eq!(names, vec!["name", "email", "subject", "message"]);
        assert_eq!(serde_json::to_string(&Field::Email).unwrap(), "\"email\"");
    }
}
