//! Secure storage for the access/refresh token pair

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::{KeyValueStore, StorageError, StorageKeys, StorageResult};

/// The two secrets held by [`TokenStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => StorageKeys::ACCESS_TOKEN,
            Self::Refresh => StorageKeys::REFRESH_TOKEN,
        }
    }
}

/// Opaque access and refresh tokens issued together
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Token persistence on top of an OS-backed secure [`KeyValueStore`]
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read one token. A miss is `Ok(None)`; any backend failure is
    /// [`StorageError::Unavailable`].
    pub async fn get(&self, key: TokenKey) -> StorageResult<Option<String>> {
        self.backend.get(key.as_str()).await.map_err(|e| match e {
            StorageError::Unavailable(_) => e,
            other => StorageError::Unavailable(other.to_string()),
        })
    }

    pub async fn access_token(&self) -> StorageResult<Option<String>> {
        self.get(TokenKey::Access).await
    }

    pub async fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.get(TokenKey::Refresh).await
    }

    /// Both tokens, or `None` if either is missing
    pub async fn load_pair(&self) -> StorageResult<Option<TokenPair>> {
        let access_token = match self.access_token().await? {
            Some(token) => token,
            None => return Ok(None),
        };
        let refresh_token = match self.refresh_token().await? {
            Some(token) => token,
            None => return Ok(None),
        };
        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    /// Store a freshly issued pair.
    ///
    /// The access token is written first. If the refresh token write then
    /// fails, both keys are removed so a new access token never sits next to
    /// a refresh token from an earlier session.
    pub async fn set_pair(&self, access_token: &str, refresh_token: &str) -> StorageResult<()> {
        self.backend
            .set(StorageKeys::ACCESS_TOKEN, access_token)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("access token: {}", e)))?;

        if let Err(e) = self
            .backend
            .set(StorageKeys::REFRESH_TOKEN, refresh_token)
            .await
        {
            warn!("Refresh token write failed, rolling back access token: {}", e);
            if let Err(rollback) = self.clear().await {
                warn!("Rollback after partial token write failed: {}", rollback);
            }
            return Err(StorageError::WriteFailed(format!("refresh token: {}", e)));
        }

        debug!("Stored token pair");
        Ok(())
    }

    /// Remove both tokens. Clearing an empty store is not an error.
    pub async fn clear(&self) -> StorageResult<()> {
        let access = self.backend.remove(StorageKeys::ACCESS_TOKEN).await;
        let refresh = self.backend.remove(StorageKeys::REFRESH_TOKEN).await;

        match (access, refresh) {
            (Ok(()), Ok(())) => {
                debug!("Cleared token pair");
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => Err(StorageError::WriteFailed(format!(
                "failed to clear tokens: {}",
                e
            ))),
        }
    }
}
