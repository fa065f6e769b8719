//! Local persistence for the session layer
//!
//! Everything the client keeps on the device lives behind the
//! [`KeyValueStore`] trait:
//! - **Secure store**: the access/refresh token pair ([`TokenStore`]),
//!   backed by the platform keychain supplied by the host application
//! - **Plain store**: guest usage ([`GuestLedger`]), the cached user profile
//!   ([`ProfileCache`]), [`Preferences`] and streaks ([`StreakTracker`])

mod file;
mod keys;
mod ledger;
mod memory;
mod preferences;
mod profile;
mod streak;
mod tokens;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use ledger::{
    generate_device_id, has_quota_remaining, remaining_free_uses, GuestLedger, GuestState,
    MAX_FREE_USES,
};
pub use memory::MemoryStore;
pub use preferences::Preferences;
pub use profile::{CachedProfile, ProfileCache};
pub use streak::StreakTracker;
pub use tokens::{TokenKey, TokenPair, TokenStore};

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store cannot be reached (e.g. device security not configured)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A write did not complete
    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    /// A stored value could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Async string key-value store.
///
/// A miss is `Ok(None)`, never an error. `remove` is idempotent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn remove(&self, key: &str) -> StorageResult<()>;

    async fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
