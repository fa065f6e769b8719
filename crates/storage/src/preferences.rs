//! Device-local user preferences

use std::sync::Arc;

use crate::{KeyValueStore, StorageKeys, StorageResult};

/// Onboarding and biometric opt-in flags
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn flag(&self, key: &str) -> StorageResult<bool> {
        Ok(self.store.get(key).await?.as_deref() == Some("true"))
    }

    async fn set_flag(&self, key: &str, value: bool) -> StorageResult<()> {
        self.store
            .set(key, if value { "true" } else { "false" })
            .await
    }

    pub async fn onboarding_complete(&self) -> StorageResult<bool> {
        self.flag(StorageKeys::ONBOARDING_COMPLETE).await
    }

    pub async fn set_onboarding_complete(&self) -> StorageResult<()> {
        self.set_flag(StorageKeys::ONBOARDING_COMPLETE, true).await
    }

    pub async fn biometric_enabled(&self) -> StorageResult<bool> {
        self.flag(StorageKeys::BIOMETRIC_ENABLED).await
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.set_flag(StorageKeys::BIOMETRIC_ENABLED, enabled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_flags_default_to_false() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert!(!prefs.onboarding_complete().await.unwrap());
        assert!(!prefs.biometric_enabled().await.unwrap());

        prefs.set_onboarding_complete().await.unwrap();
        prefs.set_biometric_enabled(true).await.unwrap();
        assert!(prefs.onboarding_complete().await.unwrap());
        assert!(prefs.biometric_enabled().await.unwrap());

        prefs.set_biometric_enabled(false).await.unwrap();
        assert!(!prefs.biometric_enabled().await.unwrap());
    }
}
