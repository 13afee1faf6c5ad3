//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{ProfileUpdate, Relation};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const CONTENT_MAX_LEN: usize = 1000;
pub const BIO_MAX_LEN: usize = 500;
pub const NAME_MAX_LEN: usize = 50;
pub const STATUS_MAX_LEN: usize = 100;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(format!(
            "Username must be at least {USERNAME_MIN_LEN} characters long"
        ));
    }

    if len > USERNAME_MAX_LEN {
        return Err(format!(
            "Username must be at most {USERNAME_MAX_LEN} characters long"
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters long"
        ));
    }

    Ok(())
}

/// Validate post or comment content, already trimmed
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.is_empty() {
        return Err("Content is required".to_string());
    }

    if content.chars().count() > CONTENT_MAX_LEN {
        return Err(format!(
            "Content must be at most {CONTENT_MAX_LEN} characters long"
        ));
    }

    Ok(())
}

/// Validate the fields present in a profile update
pub fn validate_profile(update: &ProfileUpdate) -> Result<(), String> {
    let capped = [
        ("bio", &update.bio, BIO_MAX_LEN),
        ("firstname", &update.firstname, NAME_MAX_LEN),
        ("lastname", &update.lastname, NAME_MAX_LEN),
        ("statusvalue", &update.statusvalue, STATUS_MAX_LEN),
    ];

    for (field, value, max) in capped {
        if let Some(value) = value {
            if value.chars().count() > max {
                return Err(format!("{field} must be at most {max} characters long"));
            }
        }
    }

    if let Some(relation) = &update.relation {
        if Relation::parse(relation).is_none() {
            return Err(format!("Unknown relation: {relation}"));
        }
    }

    Ok(())
}
