use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

use crate::errors::AppError;

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const SUBJECT_MAX_LEN: usize = 150;
pub const MESSAGE_MAX_LEN: usize = 2000;

const INVALID_EMAIL: &str = "Please provide a valid email address";

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dotted domain.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email shape regex is valid")
});

/// Contact form payload exactly as it arrives over the wire.
///
/// Every field is optional so that a missing field surfaces as a field error
/// rather than a body deserialization failure. Each field yields at most one
/// error: `required` when absent, otherwise whatever its custom check reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Name is required"), custom(function = "validate_name"))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Email is required"), custom(function = "validate_email_field"))]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Subject is required"), custom(function = "validate_subject"))]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Message is required"), custom(function = "validate_message"))]
    pub message: Option<String>,
}

impl ContactRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ContactRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            subject: Some(subject.into()),
            message: Some(message.into()),
        }
    }
}

fn field_error(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

fn bounded_text(value: &str, label: &str, max_len: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(field_error("required", format!("{label} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(field_error(
            "length",
            format!("{label} must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

fn validate_name(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, "Name", NAME_MAX_LEN)
}

fn validate_subject(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, "Subject", SUBJECT_MAX_LEN)
}

fn validate_message(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, "Message", MESSAGE_MAX_LEN)
}

fn validate_email_field(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(field_error("required", "Email is required".into()));
    }
    // Must also parse as a lettre address, or the owner notification's
    // reply-to could not be built.
    if trimmed.len() > EMAIL_MAX_LEN
        || !EMAIL_SHAPE.is_match(trimmed)
        || !trimmed.validate_email()
        || trimmed.parse::<lettre::Address>().is_err()
    {
        return Err(field_error("email", INVALID_EMAIL.into()));
    }
    Ok(())
}

/// A contact submission that passed validation. Only constructed through
/// `TryFrom<ContactRequest>`, so holding one means every field is well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    name: String,
    email: String,
    subject: String,
    message: String,
}

impl ContactSubmission {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TryFrom<ContactRequest> for ContactSubmission {
    type Error = AppError;

    fn try_from(request: ContactRequest) -> Result<Self, Self::Error> {
        request.validate()?;

        let field = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();

        Ok(ContactSubmission {
            name: field(request.name),
            email: field(request.email),
            subject: field(request.subject),
            message: field(request.message),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContactAcceptedResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FieldError;

    fn valid() -> ContactRequest {
        ContactRequest::new("Jane Doe", "jane@example.com", "Hello", "Hi there")
    }

    fn field_errors(request: ContactRequest) -> Vec<FieldError> {
        match ContactSubmission::try_from(request) {
            Err(AppError::ValidationError(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn accepts_well_formed_submission() {
        let submission = ContactSubmission::try_from(valid()).unwrap();
        assert_eq!(submission.name(), "Jane Doe");
        assert_eq!(submission.email(), "jane@example.com");
        assert_eq!(submission.subject(), "Hello");
        assert_eq!(submission.message(), "Hi there");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let submission = ContactSubmission::try_from(ContactRequest::new(
            "  Jane Doe ",
            " jane@example.com",
            "Hello\n",
            "\tHi there ",
        ))
        .unwrap();
        assert_eq!(submission.name(), "Jane Doe");
        assert_eq!(submission.email(), "jane@example.com");
        assert_eq!(submission.message(), "Hi there");
    }

    #[test]
    fn missing_fields_are_reported_in_form_order() {
        let errors = field_errors(ContactRequest::default());
        assert_eq!(fields(&errors), vec!["name", "email", "subject", "message"]);
        assert_eq!(errors[0].message, "Name is required");
        assert_eq!(errors[3].message, "Message is required");
    }

    #[test]
    fn whitespace_only_values_are_rejected_per_field() {
        for field in ["name", "email", "subject", "message"] {
            let mut request = valid();
            let blank = Some("   ".to_string());
            match field {
                "name" => request.name = blank,
                "email" => request.email = blank,
                "subject" => request.subject = blank,
                _ => request.message = blank,
            }
            let errors = field_errors(request);
            assert_eq!(fields(&errors), vec![field], "blank {field}");
        }
    }

    #[test]
    fn malformed_emails_fail_on_the_email_field() {
        for email in [
            "plainaddress",
            "jane@",
            "@example.com",
            "jane@example",
            "jane doe@example.com",
            "jane@@example.com",
            "jane@example.",
            "jane..doe@example.com",
            ".jane@example.com",
            "jane.@example.com",
        ] {
            let mut request = valid();
            request.email = Some(email.to_string());
            let errors = field_errors(request);
            assert_eq!(fields(&errors), vec!["email"], "{email}");
            assert_eq!(errors[0].message, INVALID_EMAIL);
        }
    }

    #[test]
    fn accepts_common_address_forms() {
        for email in ["jane.doe@example.com", "jane+site@mail.example.co.uk", "j_d-1@example.io"] {
            let mut request = valid();
            request.email = Some(email.to_string());
            assert!(ContactSubmission::try_from(request).is_ok(), "{email}");
        }
    }

    #[test]
    fn reports_one_reason_per_field() {
        let mut request = valid();
        request.email = Some("   ".into());
        let errors = field_errors(request);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Email is required");
    }

    #[test]
    fn enforces_maximum_lengths() {
        let mut request = valid();
        request.name = Some("a".repeat(NAME_MAX_LEN + 1));
        request.subject = Some("s".repeat(SUBJECT_MAX_LEN + 1));
        request.message = Some("m".repeat(MESSAGE_MAX_LEN + 1));
        let errors = field_errors(request);
        assert_eq!(fields(&errors), vec!["name", "subject", "message"]);
    }

    #[test]
    fn accepts_values_at_the_length_limit() {
        let mut request = valid();
        request.name = Some("a".repeat(NAME_MAX_LEN));
        request.message = Some("m".repeat(MESSAGE_MAX_LEN));
        assert!(ContactSubmission::try_from(request).is_ok());
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let request: ContactRequest = serde_json::from_str(r#"{"name":"Jane"}"#).unwrap();
        assert_eq!(request.name.as_deref(), Some("Jane"));
        assert!(request.email.is_none());
    }
}
