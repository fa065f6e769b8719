//! Client-side checks run before any credentials leave the device

use crate::error::{AuthError, Result};

/// Minimum password length accepted by the backend at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn check_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::ValidationError(
            "Please enter your email".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AuthError::ValidationError(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// Checks performed before `POST /auth/login`
pub fn validate_login(email: &str, password: &str) -> Result<()> {
    check_email(email)?;
    if password.is_empty() {
        return Err(AuthError::ValidationError(
            "Please enter your password".to_string(),
        ));
    }
    Ok(())
}

/// Checks performed before `POST /auth/register`
pub fn validate_registration(email: &str, password: &str) -> Result<()> {
    check_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
