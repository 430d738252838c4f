use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::auth::dto::{LoginRequest, RegisterRequest};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username, email and password are required")]
    MissingRegisterFields,
    #[error("Username must be at least {} characters", MIN_USERNAME_LEN)]
    UsernameTooShort,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Username and password are required")]
    MissingCredentials,
}

/// A named predicate over a request body. The check passes when `passes` returns true.
pub struct Check<T> {
    pub name: &'static str,
    pub passes: fn(&T) -> bool,
    pub error: ValidationError,
}

/// Registration checks, evaluated in order.
pub static REGISTER_CHECKS: &[Check<RegisterRequest>] = &[
    Check {
        name: "required_fields",
        passes: |r| {
            present(&r.username) && present(&r.email) && present(&r.password)
        },
        error: ValidationError::MissingRegisterFields,
    },
    Check {
        name: "username_length",
        passes: |r| field(&r.username).trim().chars().count() >= MIN_USERNAME_LEN,
        error: ValidationError::UsernameTooShort,
    },
    Check {
        name: "password_length",
        passes: |r| field(&r.password).chars().count() >= MIN_PASSWORD_LEN,
        error: ValidationError::PasswordTooShort,
    },
    Check {
        name: "email_format",
        passes: |r| is_valid_email(&normalize_email(field(&r.email))),
        error: ValidationError::InvalidEmail,
    },
];

pub static LOGIN_CHECKS: &[Check<LoginRequest>] = &[Check {
    name: "required_fields",
    passes: |r| present(&r.username) && present(&r.password),
    error: ValidationError::MissingCredentials,
}];

/// Runs `checks` in order and returns the error of the first one that fails.
pub fn run_checks<T>(input: &T, checks: &[Check<T>]) -> Result<(), ValidationError> {
    match checks.iter().find(|c| !(c.passes)(input)) {
        Some(check) => {
            tracing::warn!(check = check.name, "validation failed");
            Err(check.error)
        }
        None => Ok(()),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: Option<&str>, email: Option<&str>, password: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.map(Into::into),
            email: email.map(Into::into),
            password: password.map(Into::into),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        let req = register(Some("alice01"), Some("alice@example.com"), Some("secret1"));
        assert_eq!(run_checks(&req, REGISTER_CHECKS), Ok(()));
    }

    #[test]
    fn missing_or_blank_field_is_rejected_first() {
        let req = register(Some("al"), None, Some("x"));
        assert_eq!(
            run_checks(&req, REGISTER_CHECKS),
            Err(ValidationError::MissingRegisterFields)
        );
        let req = register(Some("   "), Some("alice@example.com"), Some("secret1"));
        assert_eq!(
            run_checks(&req, REGISTER_CHECKS),
            Err(ValidationError::MissingRegisterFields)
        );
    }

    #[test]
    fn checks_run_in_declared_order() {
        // Short username, short password and bad email: username wins.
        let req = register(Some("al"), Some("nope"), Some("123"));
        assert_eq!(run_checks(&req, REGISTER_CHECKS), Err(ValidationError::UsernameTooShort));

        let req = register(Some("alice"), Some("nope"), Some("123"));
        assert_eq!(run_checks(&req, REGISTER_CHECKS), Err(ValidationError::PasswordTooShort));

        let req = register(Some("alice"), Some("nope"), Some("123456"));
        assert_eq!(run_checks(&req, REGISTER_CHECKS), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email(&normalize_email("  Alice@Example.COM ")));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            username: Some("alice01".into()),
            password: None,
        };
        assert_eq!(
            run_checks(&req, LOGIN_CHECKS),
            Err(ValidationError::MissingCredentials)
        );
        let req = LoginRequest {
            username: Some("alice01".into()),
            password: Some("x".into()),
        };
        assert_eq!(run_checks(&req, LOGIN_CHECKS), Ok(()));
    }

    #[test]
    fn length_messages_quote_the_minimums() {
        assert_eq!(
            ValidationError::UsernameTooShort.to_string(),
            format!("Username must be at least {MIN_USERNAME_LEN} characters")
        );
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            format!("Password must be at least {MIN_PASSWORD_LEN} characters")
        );
    }

    #[test]
    fn check_names_are_unique() {
        let mut names: Vec<_> = REGISTER_CHECKS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REGISTER_CHECKS.len());
    }
}
