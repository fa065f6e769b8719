//! Device-local usage tracking for unauthenticated guest play

use std::sync::Arc;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{KeyValueStore, StorageKeys, StorageResult};

/// Free plays granted to a guest before registration is required
pub const MAX_FREE_USES: u32 = 3;

/// Whether a guest who has consumed `usage_count` plays may play again
pub fn has_quota_remaining(usage_count: u32, max_free_uses: u32) -> bool {
    usage_count < max_free_uses
}

pub fn remaining_free_uses(usage_count: u32, max_free_uses: u32) -> u32 {
    max_free_uses.saturating_sub(usage_count)
}

/// A fresh random device id: 32 lowercase hex digits grouped 8-4-4-4-12
pub fn generate_device_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Guest state as persisted on the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestState {
    pub device_id: Option<String>,
    pub usage_count: u32,
    pub guest_mode_active: bool,
}

/// Guest flag, usage counter and device id in plain storage.
///
/// The ledger has no notion of authentication. The session manager decides
/// when recording usage is appropriate.
#[derive(Clone)]
pub struct GuestLedger {
    store: Arc<dyn KeyValueStore>,
}

impl GuestLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the persisted guest state. Never generates a device id.
    pub async fn load(&self) -> StorageResult<GuestState> {
        let device_id = self.store.get(StorageKeys::GUEST_DEVICE_ID).await?;
        let guest_mode_active = self
            .store
            .get(StorageKeys::GUEST_MODE)
            .await?
            .map_or(false, |v| v == "true");
        let usage_count = match self.store.get(StorageKeys::GUEST_USAGE).await? {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|e| {
                warn!("Ignoring unreadable guest usage counter {:?}: {}", raw, e);
                0
            }),
            None => 0,
        };

        Ok(GuestState {
            device_id,
            usage_count,
            guest_mode_active,
        })
    }

    /// Return the stored device id, generating and persisting one if absent
    pub async fn ensure_device_id(&self) -> StorageResult<String> {
        if let Some(existing) = self.store.get(StorageKeys::GUEST_DEVICE_ID).await? {
            return Ok(existing);
        }
        let device_id = generate_device_id();
        self.store
            .set(StorageKeys::GUEST_DEVICE_ID, &device_id)
            .await?;
        info!("Generated guest device id");
        Ok(device_id)
    }

    /// Start a fresh guest session: device id ensured, flag set, counter zeroed
    pub async fn begin_guest_session(&self) -> StorageResult<String> {
        let device_id = self.ensure_device_id().await?;
        self.store.set(StorageKeys::GUEST_MODE, "true").await?;
        self.store.set(StorageKeys::GUEST_USAGE, "0").await?;
        debug!("Guest session started");
        Ok(device_id)
    }

    /// Persist one more consumed play and return the new count
    pub async fn record_usage(&self, current_count: u32) -> StorageResult<u32> {
        let new_count = current_count.saturating_add(1);
        self.store
            .set(StorageKeys::GUEST_USAGE, &new_count.to_string())
            .await?;
        debug!("Guest usage now {}", new_count);
        Ok(new_count)
    }

    /// Leave guest mode. The device id survives so a later guest session
    /// resumes the same identity.
    pub async fn clear_guest_mode(&self) -> StorageResult<()> {
        self.store.remove(StorageKeys::GUEST_MODE).await?;
        self.store.remove(StorageKeys::GUEST_USAGE).await?;
        debug!("Guest mode cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn ledger() -> (Arc<MemoryStore>, GuestLedger) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), GuestLedger::new(store))
    }

    #[test]
    fn test_quota() {
        for n in 0..3 {
            assert!(has_quota_remaining(n, MAX_FREE_USES));
        }
        for n in [3, 4, 10, u32::MAX] {
            assert!(!has_quota_remaining(n, MAX_FREE_USES));
        }
        assert_eq!(remaining_free_uses(1, MAX_FREE_USES), 2);
        assert_eq!(remaining_free_uses(7, MAX_FREE_USES), 0);
    }

    #[test]
    fn test_device_id_shape() {
        let id = generate_device_id();
        let groups: Vec<&str> = id.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
        assert!(groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }

    #[tokio::test]
    async fn test_load_does_not_fabricate_device_id() {
        let (store, ledger) = ledger();
        assert_eq!(ledger.load().await.unwrap(), GuestState::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_begin_guest_session_keeps_device_id() {
        let (_, ledger) = ledger();

        let first = ledger.begin_guest_session().await.unwrap();
        ledger.record_usage(0).await.unwrap();
        let second = ledger.begin_guest_session().await.unwrap();

        assert_eq!(first, second);
        let state = ledger.load().await.unwrap();
        assert_eq!(state.usage_count, 0);
        assert!(state.guest_mode_active);
        assert_eq!(state.device_id.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn test_record_usage_and_clear() {
        let (_, ledger) = ledger();
        let device_id = ledger.begin_guest_session().await.unwrap();

        let mut count = 0;
        for _ in 0..3 {
            count = ledger.record_usage(count).await.unwrap();
        }
        assert_eq!(ledger.load().await.unwrap().usage_count, 3);

        ledger.clear_guest_mode().await.unwrap();
        let state = ledger.load().await.unwrap();
        assert!(!state.guest_mode_active);
        assert_eq!(state.usage_count, 0);
        assert_eq!(state.device_id, Some(device_id));
    }

    #[tokio::test]
    async fn test_unreadable_counter_reads_as_zero() {
        let (store, ledger) = ledger();
        store.set(StorageKeys::GUEST_MODE, "true").await.unwrap();
        store.set(StorageKeys::GUEST_USAGE, "NaN").await.unwrap();

        let state = ledger.load().await.unwrap();
        assert!(state.guest_mode_active);
        assert_eq!(state.usage_count, 0);
    }
}
