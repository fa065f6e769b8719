//! Session and entitlement manager for the Would You Rather client
//!
//! Ties the remote auth client and local persistence into one session
//! lifecycle for the UI layer: restore at startup, email/password and Apple
//! sign-in, guest play under a free quota, refresh, sign-out and account
//! deletion.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wouldyou_session::prelude::*;
//! use wouldyou_session::storage::{FileStore, MemoryStore};
//!
//! # async fn run() -> Result<()> {
//! let options = SessionOptions::new("https://api.example.com/api")?;
//! let manager = SessionManager::connect(
//!     options,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(FileStore::new("session.json")),
//! )?;
//!
//! manager.restore().await;
//! if manager.state() == SessionState::Anonymous {
//!     manager.continue_as_guest().await?;
//! }
//! if manager.can_use_feature() {
//!     manager.increment_guest_usage().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod manager;
pub mod state;

pub use manager::SessionManager;

/// Re-export of the remote auth client crate
pub use wouldyou_auth as auth;
/// Re-export of the local persistence crate
pub use wouldyou_storage as storage;

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::SessionOptions;
    pub use crate::error::{Error, Result};
    pub use crate::state::{SessionEvent, SessionSnapshot, SessionState, SignInMethod};
    pub use crate::SessionManager;
    pub use wouldyou_auth::{AppleCredential, AuthApi, AuthClient, ErrorCode, User};
    pub use wouldyou_storage::{KeyValueStore, MAX_FREE_USES};
}
