//! Input rules shared by registration, profile updates and password reset.

use std::sync::OnceLock;

use regex::Regex;

use crate::shared::{DomainError, DomainResult};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Trim and lowercase an email, rejecting anything that is not an address.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::Validation("Email is required".into()));
    }
    if !is_valid_email(&email) {
        return Err(DomainError::Validation("Invalid email format".into()));
    }
    Ok(email)
}

pub fn validate_username(username: &str) -> DomainResult<String> {
    let username = username.trim();
    let len = username.chars().count();
    if len == 0 {
        return Err(DomainError::Validation("Username is required".into()));
    }
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(DomainError::Validation(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(username.to_string())
}

/// Passwords are bounded on both sides. bcrypt ignores input past 72 bytes,
/// so the upper bound also keeps hashes meaningful.
pub fn validate_password(password: &str) -> DomainResult<()> {
    let len = password.chars().count();
    if len == 0 {
        return Err(DomainError::Validation("Password is required".into()));
    }
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(DomainError::Validation(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Optional free-text field: trimmed, empty becomes `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}
