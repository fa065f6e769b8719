//! Last known identity of the signed-in user

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{KeyValueStore, StorageKeys, StorageResult};

/// Non-sensitive identity fields kept across restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub id: String,
    pub email: String,
}

/// Caches the identity returned at sign-in so a restore can fall back to it
/// when the identity endpoint is unreachable.
#[derive(Clone)]
pub struct ProfileCache {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns `None` for a missing or unreadable entry
    pub async fn load(&self) -> StorageResult<Option<CachedProfile>> {
        let raw = match self.store.get(StorageKeys::USER_PROFILE).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("Discarding unreadable cached profile: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, profile: &CachedProfile) -> StorageResult<()> {
        let raw = serde_json::to_string(profile)?;
        self.store.set(StorageKeys::USER_PROFILE, &raw).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.store.remove(StorageKeys::USER_PROFILE).await
    }
}
