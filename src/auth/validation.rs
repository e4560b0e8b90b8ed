//! Input rules for registration and password changes

use crate::auth::errors::AuthError;
use crate::auth::password::MAX_PASSWORD_BYTES;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

pub fn validate_password(field: &'static str, password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::validation(
            field,
            format!("Password must be at most {MAX_PASSWORD_BYTES} bytes long"),
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::validation(
            "username",
            format!("Username must be at least {MIN_USERNAME_LEN} characters long"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AuthError::validation(
            "username",
            "Username must contain only alphanumeric characters, hyphens, and underscores",
        ));
    }
    Ok(())
}

/// Structural check only: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::validation("email", "Value is not a valid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
