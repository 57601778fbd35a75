//! Input validation shared by HTTP request bodies and Slack dialog submissions.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TEAM_URL_HINT: &str =
    "Please pass the teamUrl in the request body, e.g: \"teamUrl: dvs.slack.com\"";
pub const MAX_REASON_LENGTH: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

pub type ValidationResult = Result<(), Vec<FieldError>>;

/// Implemented by every request body that must be checked before a handler runs.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

/// Collects violations and turns them into a `ValidationResult`.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
        for message in validate_prop(value, field) {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn require_some<T>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        if value.is_none() {
            self.errors.push(FieldError::new(field, format!("Please Provide a {field}")));
        }
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn number(&mut self, field: &str, value: &str) -> &mut Self {
        for message in check_number_values(value, field) {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn extend(&mut self, errors: Vec<FieldError>) -> &mut Self {
        self.errors.extend(errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(&mut self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

pub fn validate_prop(value: &str, name: &str) -> Vec<String> {
    if value.trim().is_empty() {
        vec![format!("Please Provide a {name}")]
    } else {
        Vec::new()
    }
}

pub fn validate_object_key_values(values: &BTreeMap<String, String>) -> Vec<String> {
    values
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| format!("{key} cannot be empty"))
        .collect()
}

pub fn check_number_values(value: &str, field: &str) -> Vec<String> {
    match value.trim().parse::<i64>() {
        Ok(number) if number > 0 => Vec::new(),
        _ => vec![format!("{field} must be a non-zero integer greater than zero")],
    }
}

pub fn is_trip_status(value: &str) -> bool {
    matches!(value.trim(), "Confirmed" | "Pending")
}

pub fn validate_team_url(url: &str) -> bool {
    static TEAM_URL: OnceLock<Option<Regex>> = OnceLock::new();
    TEAM_URL
        .get_or_init(|| Regex::new(r"^(https?://)?(www\.)?[a-z0-9-]+\.slack\.com/?$").ok())
        .as_ref()
        .map(|pattern| pattern.is_match(url.trim()))
        .unwrap_or(false)
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .map(|pattern| pattern.is_match(email.trim()))
        .unwrap_or(false)
}

/// Phone numbers: optional leading `+`, then 6 to 15 digits.
pub fn is_valid_phone_no(phone: &str) -> bool {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE
        .get_or_init(|| Regex::new(r"^\+?[0-9]{6,15}$").ok())
        .as_ref()
        .map(|pattern| pattern.is_match(phone.trim()))
        .unwrap_or(false)
}

/// Manager and operations reasons: required, at most 100 characters.
pub fn validate_reason(field: &str, value: &str) -> Vec<FieldError> {
    if value.trim().is_empty() {
        return vec![FieldError::new(field, "This field cannot be empty")];
    }
    if value.chars().count() > MAX_REASON_LENGTH {
        return vec![FieldError::new(
            field,
            format!("Character length must be less than or equal to {MAX_REASON_LENGTH}"),
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        check_number_values, is_trip_status, is_valid_email, is_valid_phone_no,
        validate_object_key_values, validate_prop, validate_reason, validate_team_url, Violations,
    };

    #[test]
    fn missing_prop_asks_for_it_by_name() {
        assert_eq!(validate_prop("", "role"), vec!["Please Provide a role".to_string()]);
        assert!(validate_prop("Admin", "role").is_empty());
    }

    #[test]
    fn empty_object_values_are_reported_per_key() {
        let mut values = BTreeMap::new();
        values.insert("email".to_string(), " ".to_string());
        values.insert("name".to_string(), "Tembea".to_string());
        assert_eq!(validate_object_key_values(&values), vec!["email cannot be empty".to_string()]);
    }

    #[test]
    fn number_values_must_be_positive_integers() {
        assert!(check_number_values("4", "capacity").is_empty());
        assert_eq!(
            check_number_values("0", "capacity"),
            vec!["capacity must be a non-zero integer greater than zero".to_string()]
        );
        assert_eq!(check_number_values("four", "capacity").len(), 1);
    }

    #[test]
    fn trip_status_filter_accepts_confirmed_and_pending() {
        assert!(is_trip_status("Confirmed"));
        assert!(is_trip_status("Pending"));
        assert!(!is_trip_status("Cancelled"));
    }

    #[test]
    fn team_url_must_be_a_slack_domain() {
        assert!(validate_team_url("dvs.slack.com"));
        assert!(validate_team_url("https://andela-tembea.slack.com/"));
        assert!(!validate_team_url("dvs.example.com"));
    }

    #[test]
    fn email_and_phone_formats() {
        assert!(is_valid_email("tembea.devs@andela.com"));
        assert!(!is_valid_email("tembea.devs"));
        assert!(is_valid_phone_no("+254700000000"));
        assert!(!is_valid_phone_no("07-00"));
    }

    #[test]
    fn reasons_are_required_and_bounded() {
        assert_eq!(validate_reason("declineReason", "")[0].message, "This field cannot be empty");
        assert_eq!(validate_reason("declineReason", &"x".repeat(101)).len(), 1);
        assert!(validate_reason("declineReason", "Route is full").is_empty());
    }

    #[test]
    fn violations_collect_every_failure() {
        let result = Violations::new()
            .require("name", "")
            .number("capacity", "-1")
            .check(false, "email", "Invalid email")
            .finish();
        let errors = result.expect_err("three violations");
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "name");
    }
}
