//! Field checks for registration and profile updates.
//!
//! Format checks always run before the uniqueness query, so malformed input
//! never reaches the database. Errors are collected, not short-circuited,
//! except that a gateway failure aborts the whole validation.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::gateway::{Gateway, GatewayError};

pub const NICKNAME_MIN: usize = 4;
pub const NICKNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 4;
pub const PASSWORD_MAX: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The value is malformed.
    Invalid,
    /// The value is well-formed but belongs to another account.
    Taken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub text: String,
    #[serde(skip)]
    pub kind: FieldErrorKind,
}

impl FieldError {
    fn invalid(field: &'static str, text: impl Into<String>) -> Self {
        Self { field, text: text.into(), kind: FieldErrorKind::Invalid }
    }

    fn taken(field: &'static str, text: impl Into<String>) -> Self {
        Self { field, text: text.into(), kind: FieldErrorKind::Taken }
    }

    pub fn nickname_taken() -> Self {
        Self::taken("nickname", "This nickname is already taken")
    }

    pub fn email_taken() -> Self {
        Self::taken("email", "This email is already taken")
    }
}

/// True when every error is a uniqueness conflict rather than a format error.
pub fn only_conflicts(errors: &[FieldError]) -> bool {
    !errors.is_empty() && errors.iter().all(|e| e.kind == FieldErrorKind::Taken)
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Emails are stored and compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn within(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.chars().count())
}

pub async fn validate_nickname(
    gw: &dyn Gateway,
    nickname: &str,
) -> Result<Vec<FieldError>, GatewayError> {
    if !within(nickname, NICKNAME_MIN, NICKNAME_MAX) {
        return Ok(vec![FieldError::invalid(
            "nickname",
            format!("Nickname must be {NICKNAME_MIN} to {NICKNAME_MAX} characters long"),
        )]);
    }
    if gw.nickname_exists(nickname).await? {
        return Ok(vec![FieldError::nickname_taken()]);
    }
    Ok(Vec::new())
}

pub async fn validate_email(
    gw: &dyn Gateway,
    email: &str,
) -> Result<Vec<FieldError>, GatewayError> {
    if !is_valid_email(email) {
        return Ok(vec![FieldError::invalid("email", "Invalid email")]);
    }
    if gw.email_exists(email).await? {
        return Ok(vec![FieldError::email_taken()]);
    }
    Ok(Vec::new())
}

pub fn validate_password(password: &str) -> Vec<FieldError> {
    if within(password, PASSWORD_MIN, PASSWORD_MAX) {
        Vec::new()
    } else {
        vec![FieldError::invalid(
            "password",
            format!("Password must be {PASSWORD_MIN} to {PASSWORD_MAX} characters long"),
        )]
    }
}

/// Nickname, then email, then password.
pub async fn validate_registration(
    gw: &dyn Gateway,
    nickname: &str,
    email: &str,
    password: &str,
) -> Result<Vec<FieldError>, GatewayError> {
    let mut errors = validate_nickname(gw, nickname).await?;
    errors.extend(validate_email(gw, email).await?);
    errors.extend(validate_password(password));
    Ok(errors)
}
