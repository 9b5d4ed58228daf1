//! Input validation for employee records

use common::models::PasswordPolicy;
use regex::Regex;
use std::sync::OnceLock;

/// Validate an employee login handle. Stored as typed, never trimmed.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

    match regex {
        Some(regex) if regex.is_match(email) => Ok(()),
        _ => Err("Invalid email format".to_string()),
    }
}

/// Validate a new password against the company's policy, if it has one.
/// Without a policy any non-empty password is accepted.
pub fn validate_password(password: &str, policy: Option<&PasswordPolicy>) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let Some(policy) = policy else {
        return Ok(());
    };

    if password.chars().count() < policy.min_length as usize {
        return Err(format!(
            "Password must be at least {} characters long",
            policy.min_length
        ));
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_uppercase() {
            has_upper = true;
        } else if c.is_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() {
            has_special = true;
        }
    }

    if policy.require_uppercase && !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if policy.require_lowercase && !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if policy.require_numbers && !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    if policy.require_special_chars && !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
