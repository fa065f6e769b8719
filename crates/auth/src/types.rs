//! Wire types for the auth endpoints

use serde::{Deserialize, Serialize};

/// Identity record returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Response shared by login, register, Apple sign-in and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Email/password credentials
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Payload forwarded from the native Sign in with Apple sheet
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppleCredential {
    pub identity_token: String,
    pub authorization_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Apple only shares the email on the first sign-in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshTokenBody<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteAccountBody<'a> {
    pub password: &'a str,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HealthResponse {
    pub status: String,
}

/// Outcome of the startup token probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionValidity {
    pub valid: bool,
}

impl SessionValidity {
    pub const VALID: Self = Self { valid: true };
    pub const INVALID: Self = Self { valid: false };
}
