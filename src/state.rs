//! Session state, snapshots and change events

use wouldyou_auth::{ErrorCode, User};
use wouldyou_storage::TokenPair;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Restore has not finished yet
    Initializing,
    /// Neither signed in nor playing as a guest
    Anonymous,
    /// Unauthenticated play under the free quota
    Guest,
    /// Signed in with a token pair
    Authenticated,
}

/// How the user signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignInMethod {
    Password,
    Registration,
    Apple,
    /// Identity restored from persisted tokens at startup
    Restore,
}

/// Notifications sent to [`crate::SessionManager::on_state_change`] subscribers.
///
/// Side effects such as haptics or analytics hang off these rather than
/// the transitions themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Restore finished and resolved to `state`
    Restored(SessionState),
    SignedIn { user: User, method: SignInMethod },
    SignInFailed { method: SignInMethod, code: ErrorCode },
    GuestSessionStarted { device_id: String },
    GuestUsageRecorded { count: u32, remaining: u32 },
    SignedOut,
    AccountDeleted,
    /// Local persistence failed but the in-memory session carried on
    StorageWarning(String),
}

/// Point-in-time view of the session for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_guest: bool,
    pub guest_usage_count: u32,
    pub guest_device_id: Option<String>,
    pub user: Option<User>,
}

/// In-memory session held by the manager.
///
/// Tokens are mirrored here so a failed keychain write only costs the user
/// a sign-in after the next restart. They never appear in snapshots.
pub(crate) struct Session {
    pub state: SessionState,
    pub user: Option<User>,
    pub guest_usage_count: u32,
    pub guest_device_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn initializing() -> Self {
        Self {
            state: SessionState::Initializing,
            user: None,
            guest_usage_count: 0,
            guest_device_id: None,
            access_token: None,
            refresh_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated && self.user.is_some()
    }

    pub fn is_guest(&self) -> bool {
        self.state == SessionState::Guest
    }

    /// Enter the authenticated state; guest mode and its counter are dropped
    pub fn authenticate(&mut self, user: User, tokens: TokenPair) {
        self.state = SessionState::Authenticated;
        self.user = Some(user);
        self.guest_usage_count = 0;
        self.access_token = Some(tokens.access_token);
        self.refresh_token = Some(tokens.refresh_token);
    }

    pub fn enter_guest(&mut self, device_id: String, usage_count: u32) {
        self.state = SessionState::Guest;
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.guest_device_id = Some(device_id);
        self.guest_usage_count = usage_count;
    }

    /// Back to anonymous. The device id is kept, matching the ledger.
    pub fn reset(&mut self) {
        self.state = SessionState::Anonymous;
        self.user = None;
        self.guest_usage_count = 0;
        self.access_token = None;
        self.refresh_token = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            is_authenticated: self.is_authenticated(),
            is_loading: self.state == SessionState::Initializing,
            is_guest: self.is_guest(),
            guest_usage_count: self.guest_usage_count,
            guest_device_id: self.guest_device_id.clone(),
            user: self.user.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_guest_to_authenticated_clears_counter() {
        let mut session = Session::initializing();
        assert!(session.snapshot().is_loading);

        session.enter_guest("device".to_string(), 2);
        assert!(session.is_guest());

        session.authenticate(user(), tokens());
        assert_eq!(session.access_token.as_deref(), Some("access"));
        let snapshot = session.snapshot();
        assert!(snapshot.is_authenticated);
        assert!(!snapshot.is_guest);
        assert_eq!(snapshot.guest_usage_count, 0);
        assert_eq!(snapshot.guest_device_id.as_deref(), Some("device"));
    }

    #[test]
    fn test_reset_keeps_device_id() {
        let mut session = Session::initializing();
        session.enter_guest("device".to_string(), 1);
        session.authenticate(user(), tokens());
        session.reset();
        assert!(session.refresh_token.is_none());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Anonymous);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.guest_usage_count, 0);
        assert_eq!(snapshot.guest_device_id.as_deref(), Some("device"));
    }
}
