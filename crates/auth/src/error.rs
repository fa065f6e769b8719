//! Error taxonomy for the remote auth client

use serde::Deserialize;
use thiserror::Error;

/// Machine-readable classification of an [`AuthError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidCredentials,
    EmailTaken,
    WeakPassword,
    InvalidAppleCredential,
    ReauthenticationRequired,
    ValidationError,
    NetworkError,
    Timeout,
    ApiError,
    SerializationError,
    UrlError,
}

impl ErrorCode {
    /// Whether the user can fix the problem by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::EmailTaken
                | Self::WeakPassword
                | Self::InvalidAppleCredential
                | Self::ReauthenticationRequired
                | Self::ValidationError
        )
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::Timeout)
    }
}

/// Errors returned by the auth client
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Password rejected: {0}")]
    WeakPassword(String),

    #[error("Invalid Apple credential: {0}")]
    InvalidAppleCredential(String),

    #[error("Reauthentication required: {0}")]
    ReauthenticationRequired(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCredentials(_) => ErrorCode::InvalidCredentials,
            Self::EmailTaken(_) => ErrorCode::EmailTaken,
            Self::WeakPassword(_) => ErrorCode::WeakPassword,
            Self::InvalidAppleCredential(_) => ErrorCode::InvalidAppleCredential,
            Self::ReauthenticationRequired(_) => ErrorCode::ReauthenticationRequired,
            Self::ValidationError(_) => ErrorCode::ValidationError,
            Self::NetworkError(_) => ErrorCode::NetworkError,
            Self::Timeout => ErrorCode::Timeout,
            Self::ApiError { .. } => ErrorCode::ApiError,
            Self::SerializationError(_) => ErrorCode::SerializationError,
            Self::UrlError(_) => ErrorCode::UrlError,
        }
    }

    /// Message suitable for showing inline next to a form.
    ///
    /// User-correctable errors carry the server's (or validator's) wording verbatim.
    /// Everything else collapses to `fallback` so transport noise never reaches the UI.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::InvalidCredentials(msg)
            | Self::EmailTaken(msg)
            | Self::WeakPassword(msg)
            | Self::InvalidAppleCredential(msg)
            | Self::ReauthenticationRequired(msg)
            | Self::ValidationError(msg)
                if !msg.is_empty() =>
            {
                msg.clone()
            }
            Self::ApiError { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Error payload returned by the backend: `{ "error": true, "message": "..." }`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the server's message from an error body, falling back to the raw text
pub(crate) fn server_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ => body.trim().to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
