//! Error handling for the session manager

use thiserror::Error;
use wouldyou_auth::{AuthError, ErrorCode};
use wouldyou_storage::StorageError;

use crate::state::SessionState;

/// Unified error type for session operations
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the remote auth client
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Errors from local persistence
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The operation is not allowed in the current state
    #[error("Cannot {operation} while {state:?}")]
    InvalidTransition {
        state: SessionState,
        operation: &'static str,
    },

    /// A guest has used up the free plays
    #[error("Guest quota exhausted ({used}/{limit} free plays used)")]
    GuestQuotaExhausted { used: u32, limit: u32 },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// The auth error code, if this error came from the backend or validation
    pub fn auth_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Auth(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Message for inline display, using `fallback` when nothing more
    /// specific is available
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Auth(err) => err.user_message(fallback),
            Error::GuestQuotaExhausted { .. } => {
                "You've used all your free plays. Create an account to keep playing.".to_string()
            }
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
