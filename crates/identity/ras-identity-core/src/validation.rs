//! Stateless input validation for sign-up and sign-in forms.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmailValidationError {
    #[error("No email entered")]
    NoEmailEntered,

    #[error("Not a valid email")]
    NotAValidEmail,
}

/// Validate an email address, returning it with surrounding spaces and tabs
/// removed. Line breaks are not trimmed and make the address invalid.
pub fn validate_email(email: Option<&str>) -> Result<String, EmailValidationError> {
    let email = email
        .ok_or(EmailValidationError::NoEmailEntered)?
        .trim_matches([' ', '\t']);

    if EMAIL_PATTERN.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(EmailValidationError::NotAValidEmail)
    }
}
