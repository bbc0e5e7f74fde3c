//! Field rules shared by the contact form and the relay.
//!
//! Both sides evaluate the same [`RULES`] table: the form uses it for inline
//! feedback, the relay uses it through [`present`] and [`email_format`] to
//! reject payloads before anything reaches the email provider.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::form::FormData;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern must compile")
});

/// One of the four contact form fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Subject,
    Message,
}

impl Field {
    /// Every field, in form order.
    pub const ALL: [Field; 4] =
        [Field::Name, Field::Email, Field::Subject, Field::Message];

    /// Key used on the wire and in error maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Subject => "subject",
            Field::Message => "message",
        }
    }

    /// Rule applied to this field.
    pub fn rule(&self) -> &'static Rule {
        &RULES[*self as usize]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing a name that is not a contact form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Field::Name),
            "email" => Ok(Field::Email),
            "subject" => Ok(Field::Subject),
            "message" => Ok(Field::Message),
            other => Err(UnknownField(other.to_owned())),
        }
    }
}

/// Constraints of a single field.
#[derive(Debug, PartialEq, Eq)]
pub struct Rule {
    pub field: Field,
    /// Human label used in messages.
    pub label: &'static str,
    /// Minimum length of the trimmed value.
    pub min: Option<usize>,
    /// Maximum length. Trimmed value, except for email where the raw
    /// value is measured.
    pub max: usize,
    /// Whether the value must look like `local@domain.tld`.
    pub email: bool,
}

/// Rule table, indexed by [`Field`] discriminant.
pub const RULES: [Rule; 4] = [
    Rule {
        field: Field::Name,
        label: "Name",
        min: Some(2),
        max: 100,
        email: false,
    },
    Rule {
        field: Field::Email,
        label: "Email",
        min: None,
        max: 254,
        email: true,
    },
    Rule {
        field: Field::Subject,
        label: "Subject",
        min: Some(5),
        max: 200,
        email: false,
    },
    Rule {
        field: Field::Message,
        label: "Message",
        min: Some(10),
        max: 2000,
        email: false,
    },
];

/// Rule violation for one field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{label} is required")]
    Required { label: &'static str },
    #[error("{label} must be at least {min} characters")]
    TooShort { label: &'static str, min: usize },
    #[error("{label} must be less than {max} characters")]
    TooLong { label: &'static str, max: usize },
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

impl FieldError {
    /// Machine readable code, matching the ones given to
    /// [`ValidationError`].
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::Required { .. } => "required",
            FieldError::TooShort { .. } | FieldError::TooLong { .. } => "length",
            FieldError::InvalidEmail => "email",
        }
    }
}

impl Rule {
    /// Check `value`, returning the first violated constraint.
    ///
    /// Order is required, min, max for text fields and required, pattern,
    /// max for email.
    pub fn check(&self, value: &str) -> Option<FieldError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Some(FieldError::Required { label: self.label });
        }

        if self.email {
            if !is_email(value) {
                return Some(FieldError::InvalidEmail);
            }
            if value.chars().count() > self.max {
                return Some(FieldError::TooLong {
                    label: self.label,
                    max: self.max,
                });
            }
            return None;
        }

        let length = trimmed.chars().count();
        match self.min {
            Some(min) if length < min => Some(FieldError::TooShort {
                label: self.label,
                min,
            }),
            _ if length > self.max => Some(FieldError::TooLong {
                label: self.label,
                max: self.max,
            }),
            _ => None,
        }
    }
}

/// Whether `value` matches the `local@domain.tld` shape.
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Validate a single field.
pub fn validate(field: Field, value: &str) -> Option<FieldError> {
    field.rule().check(value)
}

/// Validate a field given by name. Unknown names are never in error.
pub fn validate_named(name: &str, value: &str) -> Option<FieldError> {
    name.parse::<Field>()
        .ok()
        .and_then(|field| validate(field, value))
}

/// Per-field error messages. A missing key means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message recorded for `field`, if any.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Store the outcome of a validation; `None` clears the field.
    pub fn set(&mut self, field: Field, error: Option<FieldError>) {
        match error {
            Some(error) => {
                self.0.insert(field, error.to_string());
            },
            None => {
                self.0.remove(&field);
            },
        }
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Run every rule against `data`.
pub fn validate_form(data: &FormData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in Field::ALL {
        errors.set(field, validate(field, data.get(field)));
    }
    errors
}

fn to_validation_error(error: FieldError) -> ValidationError {
    ValidationError::new(error.code()).with_message(error.to_string().into())
}

/// Relay hook: the value must not be blank.
pub fn present(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let label = "Value";
        return Err(to_validation_error(FieldError::Required { label }));
    }

    Ok(())
}

/// Relay hook: the value must be a present, well formed email address.
pub fn email_format(value: &str) -> Result<(), ValidationError> {
    present(value)?;
    match Field::Email.rule().check(value) {
        Some(FieldError::Required { .. }) | None => Ok(()),
        Some(FieldError::InvalidEmail) => {
            Err(to_validation_error(FieldError::InvalidEmail))
        },
        // Overlong addresses are rejected as malformed by the relay.
        Some(_) => Err(to_validation_error(FieldError::InvalidEmail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table_is_indexed_by_field() {
        for field in Field::ALL {
            assert_eq!(field.rule().field, field);
        }
    }

    #[test]
    fn test_email() {
        assert_eq!(validate(Field::Email, "john@example.com"), None);
        assert_eq!(validate(Field::Email, "first.last+tag@mail.example.co"), None);

        assert_eq!(
            validate(Field::Email, "john@"),
            Some(FieldError::InvalidEmail)
        );
        assert_eq!(
            validate(Field::Email, "john.example.com"),
            Some(FieldError::InvalidEmail)
        );
        assert_eq!(
            validate(Field::Email, "john@example.c"),
            Some(FieldError::InvalidEmail)
        );
        assert_eq!(
            validate(Field::Email, "john@example..com"),
            Some(FieldError::InvalidEmail)
        );
        assert_eq!(
            validate(Field::Email, ""),
            Some(FieldError::Required { label: "Email" })
        );
    }

    #[test]
    fn test_email_max_length_after_pattern() {
        let local = "a".repeat(250);
        let email = format!("{local}@example.com");
        assert_eq!(
            validate(Field::Email, &email),
            Some(FieldError::TooLong {
                label: "Email",
                max: 254
            })
        );
    }

    #[test]
    fn test_name_length() {
        assert_eq!(
            validate(Field::Name, "A"),
            Some(FieldError::TooShort {
                label: "Name",
                min: 2
            })
        );
        assert_eq!(
            validate(Field::Name, &"A".repeat(101)),
            Some(FieldError::TooLong {
                label: "Name",
                max: 100
            })
        );
        assert_eq!(validate(Field::Name, "Jo"), None);
        // Surrounding whitespace is not counted.
        assert!(validate(Field::Name, "  J  ").is_some());
        assert_eq!(
            validate(Field::Name, "   "),
            Some(FieldError::Required { label: "Name" })
        );
    }

    #[test]
    fn test_subject_and_message_bounds() {
        assert!(validate(Field::Subject, "Hey").is_some());
        assert_eq!(validate(Field::Subject, "Hello"), None);
        assert!(validate(Field::Subject, &"x".repeat(201)).is_some());

        assert!(validate(Field::Message, "Too short").is_some());
        assert_eq!(validate(Field::Message, "Long enough."), None);
        assert!(validate(Field::Message, &"x".repeat(2001)).is_some());
        assert_eq!(validate(Field::Message, &"é".repeat(2000)), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            validate(Field::Name, "").map(|e| e.to_string()).as_deref(),
            Some("Name is required")
        );
        assert_eq!(
            validate(Field::Subject, "Hi")
                .map(|e| e.to_string())
                .as_deref(),
            Some("Subject must be at least 5 characters")
        );
    }

    #[test]
    fn test_idempotent_on_valid_values() {
        let values = [
            (Field::Name, "Jane"),
            (Field::Email, "jane@x.com"),
            (Field::Subject, "Hello there"),
            (Field::Message, "This is a message."),
        ];
        for (field, value) in values {
            assert_eq!(validate(field, value), None);
            assert_eq!(validate(field, value), None);
        }
    }

    #[test]
    fn test_unknown_field_is_valid() {
        assert_eq!(validate_named("phone", ""), None);
        assert_eq!(
            validate_named("name", ""),
            Some(FieldError::Required { label: "Name" })
        );
        assert!("phone".parse::<Field>().is_err());
    }

    #[test]
    fn test_validate_form() {
        let data = FormData {
            name: "A".into(),
            email: "bad".into(),
            subject: "Hello there".into(),
            message: String::new(),
        };
        let errors = validate_form(&data);

        assert_eq!(errors.len(), 3);
        assert!(errors.contains(Field::Name));
        assert!(errors.contains(Field::Email));
        assert!(!errors.contains(Field::Subject));
        assert_eq!(errors.get(Field::Message), Some("Message is required"));
    }

    #[test]
    fn test_relay_hooks() {
        assert!(present("Jane").is_ok());
        assert_eq!(present(" ").unwrap_err().code, "required");

        assert!(email_format("jane@x.com").is_ok());
        assert_eq!(email_format("bad").unwrap_err().code, "email");
        assert_eq!(email_format("").unwrap_err().code, "required");
    }
}
