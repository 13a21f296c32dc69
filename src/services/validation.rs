//! Field-level validation shared by the identity and decision services.
//!
//! Errors are collected per field so a single response can report every
//! problem with a payload at once.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_UNIQUE: &str = "This field must be unique.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trim a required text field and record why it is unusable, if it is.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }

    if let Some(max) = max_len
        && trimmed.chars().count() > max
    {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
        return None;
    }

    Some(trimmed.to_string())
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@([^\s@.]+\.)+[^\s@.]+$|^[^\s@]+@localhost$")
            .expect("valid email regex")
    })
}

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;

#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    username.chars().count() <= USERNAME_MAX_LEN && username_regex().is_match(username)
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LEN && email_regex().is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_reports_missing_and_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(required_text(&mut errors, "title", None, None), None);
        assert_eq!(required_text(&mut errors, "description", Some("   "), None), None);
        assert_eq!(errors.messages("title"), [REQUIRED]);
        assert_eq!(errors.messages("description"), [BLANK]);
    }

    #[test]
    fn required_text_trims_and_limits_length() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            required_text(&mut errors, "title", Some("  Ship it "), Some(200)),
            Some("Ship it".to_string())
        );
        assert!(errors.is_empty());

        let long = "a".repeat(201);
        assert_eq!(required_text(&mut errors, "title", Some(&long), Some(200)), None);
        assert!(errors.has("title"));
    }

    #[test]
    fn usernames() {
        assert!(is_valid_username("testuser"));
        assert!(is_valid_username("first.last+tag@host-1_x"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("semi;colon"));
        assert!(!is_valid_username(&"a".repeat(151)));
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("test@testuser.com"));
        assert!(is_valid_email("admin@localhost"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("user@nodot"));
    }

    #[test]
    fn display_joins_all_messages() {
        let mut errors = FieldErrors::non_field("Those passwords don't match.");
        errors.add("email", NOT_UNIQUE);
        assert_eq!(
            errors.to_string(),
            "email: This field must be unique.; non_field_errors: Those passwords don't match."
        );
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
