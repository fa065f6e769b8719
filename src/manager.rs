//! Session lifecycle: restore, sign-in, guest play, sign-out

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, trace, warn};
use wouldyou_auth::{
    AppleCredential, AuthApi, AuthClient, AuthError, AuthResponse, ErrorCode, User,
};
use wouldyou_storage::{
    generate_device_id, has_quota_remaining, remaining_free_uses, CachedProfile, GuestLedger,
    GuestState, KeyValueStore, ProfileCache, StorageError, TokenPair, TokenStore,
};

use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::state::{Session, SessionEvent, SessionSnapshot, SessionState, SignInMethod};

/// Owns the session for one app instance.
///
/// Collaborators are injected: an [`AuthApi`] for the network, a secure
/// [`KeyValueStore`] for tokens and a plain one for guest state and the
/// cached profile. State-changing operations are serialised internally, so
/// an overlapping `login` and `logout` run one after the other.
pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    tokens: TokenStore,
    ledger: GuestLedger,
    profiles: ProfileCache,
    options: SessionOptions,
    session: RwLock<Session>,
    transition: Mutex<()>,
    state_change: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager in the `Initializing` state. Call [`restore`](Self::restore)
    /// before reading state.
    pub fn new(
        auth: Arc<dyn AuthApi>,
        secure_store: Arc<dyn KeyValueStore>,
        local_store: Arc<dyn KeyValueStore>,
        options: SessionOptions,
    ) -> Self {
        let (state_change, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            auth,
            tokens: TokenStore::new(secure_store),
            ledger: GuestLedger::new(local_store.clone()),
            profiles: ProfileCache::new(local_store),
            options,
            session: RwLock::new(Session::initializing()),
            transition: Mutex::new(()),
            state_change,
        }
    }

    /// Create a manager talking HTTP to `options.api_url`
    pub fn connect(
        options: SessionOptions,
        secure_store: Arc<dyn KeyValueStore>,
        local_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(AuthError::from)?;
        let auth = AuthClient::new(
            &options.api_url,
            http_client,
            options.auth_client_options(),
        );
        Ok(Self::new(Arc::new(auth), secure_store, local_store, options))
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if self.state_change.send(event).is_err() {
            trace!("No subscribers for session event");
        }
    }

    fn storage_warning(&self, context: &str, err: StorageError) {
        warn!(error = %err, "{}", context);
        self.emit(SessionEvent::StorageWarning(format!("{}: {}", context, err)));
    }

    // ==========================================
    // Observation
    // ==========================================

    /// Receiver for session change notifications
    pub fn on_state_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.state_change.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn is_loading(&self) -> bool {
        self.state() == SessionState::Initializing
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_guest(&self) -> bool {
        self.read().is_guest()
    }

    pub fn guest_usage_count(&self) -> u32 {
        self.read().guest_usage_count
    }

    pub fn guest_device_id(&self) -> Option<String> {
        self.read().guest_device_id.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether the user may vote again: always when signed in, otherwise
    /// while guest usage is under the free quota.
    pub fn can_use_feature(&self) -> bool {
        let session = self.read();
        session.is_authenticated()
            || has_quota_remaining(session.guest_usage_count, self.options.max_free_uses)
    }

    /// Free plays left; `None` when signed in
    pub fn remaining_free_uses(&self) -> Option<u32> {
        let session = self.read();
        if session.is_authenticated() {
            None
        } else {
            Some(remaining_free_uses(
                session.guest_usage_count,
                self.options.max_free_uses,
            ))
        }
    }

    /// Like [`can_use_feature`](Self::can_use_feature) but returns the
    /// reason, so the UI can offer registration instead of a silent denial.
    pub fn require_feature(&self) -> Result<()> {
        if self.can_use_feature() {
            return Ok(());
        }
        Err(Error::GuestQuotaExhausted {
            used: self.guest_usage_count(),
            limit: self.options.max_free_uses,
        })
    }

    // ==========================================
    // Restore
    // ==========================================

    /// Rebuild the session from persisted state.
    ///
    /// A valid token wins over a persisted guest flag. Any failure reading
    /// or validating the token clears the tokens and falls back to the
    /// guest state, or `Anonymous` if there is none. Never fails.
    pub async fn restore(&self) -> SessionState {
        let _guard = self.transition.lock().await;

        let guest = match self.ledger.load().await {
            Ok(guest) => guest,
            Err(e) => {
                self.storage_warning("Failed to read guest state", e);
                GuestState::default()
            }
        };

        let device_id = match (&guest.device_id, guest.guest_mode_active) {
            (Some(id), _) => Some(id.clone()),
            (None, true) => Some(self.ensure_device_id().await),
            (None, false) => None,
        };

        let restored = self.restore_identity().await;

        let state = {
            let mut session = self.write();
            session.guest_device_id = device_id.clone();
            match (restored, device_id) {
                (Some((user, tokens)), _) => session.authenticate(user, tokens),
                (None, Some(device_id)) if guest.guest_mode_active => {
                    session.enter_guest(device_id, guest.usage_count)
                }
                _ => session.reset(),
            }
            session.state
        };

        if state == SessionState::Authenticated && guest.guest_mode_active {
            if let Err(e) = self.ledger.clear_guest_mode().await {
                self.storage_warning("Failed to clear stale guest mode", e);
            }
        }

        info!(?state, "Session restored");
        self.emit(SessionEvent::Restored(state));
        state
    }

    async fn ensure_device_id(&self) -> String {
        match self.ledger.ensure_device_id().await {
            Ok(id) => id,
            Err(e) => {
                self.storage_warning("Failed to persist guest device id", e);
                generate_device_id()
            }
        }
    }

    /// Stored tokens plus the identity they belong to, if both check out
    async fn restore_identity(&self) -> Option<(User, TokenPair)> {
        let tokens = match self.tokens.load_pair().await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => {
                // Either token on its own is a half-written pair
                let access = self.tokens.access_token().await;
                let refresh = self.tokens.refresh_token().await;
                if matches!(access, Ok(Some(_))) || matches!(refresh, Ok(Some(_))) {
                    warn!("Incomplete token pair, discarding");
                    self.discard_tokens().await;
                }
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Cannot read stored tokens, treating as signed out");
                self.discard_tokens().await;
                return None;
            }
        };

        if !self.auth.validate_session(&tokens.access_token).await.valid {
            info!("Stored session is no longer valid");
            self.discard_tokens().await;
            return None;
        }

        let lookup = tokio::time::timeout(
            self.options.validate_timeout,
            self.auth.fetch_user(&tokens.access_token),
        )
        .await;

        match lookup {
            Ok(Ok(user)) => {
                self.cache_profile(&user).await;
                Some((user, tokens))
            }
            Ok(Err(e)) if e.code() == ErrorCode::InvalidCredentials => {
                info!("Stored token rejected by identity endpoint");
                self.discard_tokens().await;
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Identity endpoint unavailable, using cached profile");
                self.cached_identity(tokens).await
            }
            Err(_) => {
                debug!(
                    timeout = ?self.options.validate_timeout,
                    "Identity lookup timed out, using cached profile"
                );
                self.cached_identity(tokens).await
            }
        }
    }

    async fn cached_identity(&self, tokens: TokenPair) -> Option<(User, TokenPair)> {
        match self.profiles.load().await {
            Ok(Some(profile)) => Some((
                User {
                    id: profile.id,
                    email: profile.email,
                },
                tokens,
            )),
            _ => {
                warn!("No identity for stored session, discarding tokens");
                self.discard_tokens().await;
                None
            }
        }
    }

    async fn discard_tokens(&self) {
        if let Err(e) = self.tokens.clear().await {
            self.storage_warning("Failed to clear tokens", e);
        }
        if let Err(e) = self.profiles.clear().await {
            self.storage_warning("Failed to clear cached profile", e);
        }
    }

    async fn cache_profile(&self, user: &User) {
        let profile = CachedProfile {
            id: user.id.clone(),
            email: user.email.clone(),
        };
        if let Err(e) = self.profiles.save(&profile).await {
            self.storage_warning("Failed to cache user profile", e);
        }
    }

    // ==========================================
    // Sign-in
    // ==========================================

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.sign_in(SignInMethod::Password, self.auth.login(email, password))
            .await
    }

    /// Create an account and sign in
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        self.sign_in(
            SignInMethod::Registration,
            self.auth.register(email, password),
        )
        .await
    }

    /// Sign in with the credential produced by the native Apple sheet.
    ///
    /// A cancelled sheet never produces a credential; callers should treat
    /// cancellation as a no-op rather than calling this.
    pub async fn login_with_apple(&self, credential: &AppleCredential) -> Result<User> {
        self.sign_in(SignInMethod::Apple, self.auth.login_with_apple(credential))
            .await
    }

    async fn sign_in<F>(&self, method: SignInMethod, request: F) -> Result<User>
    where
        F: Future<Output = wouldyou_auth::Result<AuthResponse>>,
    {
        let _guard = self.transition.lock().await;

        let response = match request.await {
            Ok(response) => response,
            Err(e) => {
                debug!(?method, error = %e, "Sign-in failed");
                self.emit(SessionEvent::SignInFailed {
                    method,
                    code: e.code(),
                });
                return Err(e.into());
            }
        };

        let user = self.complete_sign_in(response).await;
        info!(user_id = %user.id, ?method, "Signed in");
        self.emit(SessionEvent::SignedIn {
            user: user.clone(),
            method,
        });
        Ok(user)
    }

    /// Persist a fresh token pair and switch to `Authenticated`.
    ///
    /// Tokens are written before guest markers are removed, so a crash in
    /// between still restores as signed in. Write failures are reported as
    /// warnings; the in-memory session proceeds regardless.
    async fn complete_sign_in(&self, response: AuthResponse) -> User {
        let AuthResponse {
            access_token,
            refresh_token,
            user,
        } = response;

        if let Err(e) = self.tokens.set_pair(&access_token, &refresh_token).await {
            self.storage_warning("Failed to persist tokens", e);
        }
        self.cache_profile(&user).await;
        if let Err(e) = self.ledger.clear_guest_mode().await {
            self.storage_warning("Failed to clear guest mode", e);
        }

        self.write().authenticate(
            user.clone(),
            TokenPair {
                access_token,
                refresh_token,
            },
        );
        user
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// A rejected refresh token ends the session.
    pub async fn refresh_session(&self) -> Result<User> {
        let _guard = self.transition.lock().await;
        self.ensure_authenticated("refresh the session")?;

        let refresh_token = match self.current_refresh_token().await {
            Some(token) => token,
            None => {
                warn!("No refresh token available, ending session");
                self.clear_local_session().await;
                self.emit(SessionEvent::SignedOut);
                return Err(AuthError::InvalidCredentials(
                    "Session expired, please sign in again".to_string(),
                )
                .into());
            }
        };

        match self.auth.refresh(&refresh_token).await {
            Ok(response) => {
                let user = self.complete_sign_in(response).await;
                debug!(user_id = %user.id, "Session refreshed");
                Ok(user)
            }
            Err(e) if e.code() == ErrorCode::InvalidCredentials => {
                info!("Refresh token rejected, ending session");
                self.clear_local_session().await;
                self.emit(SessionEvent::SignedOut);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // Guest mode
    // ==========================================

    /// Start a fresh guest session with a zeroed usage counter.
    ///
    /// Returns the device id, which stays stable across guest sessions.
    /// Already in guest mode, the running session is kept as is.
    pub async fn continue_as_guest(&self) -> Result<String> {
        let _guard = self.transition.lock().await;

        let (state, current_device) = {
            let session = self.read();
            (session.state, session.guest_device_id.clone())
        };
        match (state, current_device) {
            (SessionState::Authenticated, _) => {
                return Err(Error::InvalidTransition {
                    state,
                    operation: "continue as guest",
                });
            }
            (SessionState::Guest, Some(device_id)) => {
                debug!("Already in guest mode");
                return Ok(device_id);
            }
            _ => {}
        }

        let device_id = match self.ledger.begin_guest_session().await {
            Ok(device_id) => device_id,
            Err(e) => {
                self.storage_warning("Failed to persist guest session", e);
                self.guest_device_id().unwrap_or_else(generate_device_id)
            }
        };

        self.write().enter_guest(device_id.clone(), 0);
        info!("Continuing as guest");
        self.emit(SessionEvent::GuestSessionStarted {
            device_id: device_id.clone(),
        });
        Ok(device_id)
    }

    /// Count one consumed free play and return the new total.
    ///
    /// Does nothing outside guest mode.
    pub async fn increment_guest_usage(&self) -> u32 {
        let _guard = self.transition.lock().await;

        let (state, current) = {
            let session = self.read();
            (session.state, session.guest_usage_count)
        };
        if state != SessionState::Guest {
            debug!(?state, "Not in guest mode, usage not recorded");
            return current;
        }

        let count = match self.ledger.record_usage(current).await {
            Ok(count) => count,
            Err(e) => {
                self.storage_warning("Failed to persist guest usage", e);
                current.saturating_add(1)
            }
        };

        self.write().guest_usage_count = count;
        let remaining = remaining_free_uses(count, self.options.max_free_uses);
        debug!(count, remaining, "Guest usage recorded");
        self.emit(SessionEvent::GuestUsageRecorded { count, remaining });
        count
    }

    // ==========================================
    // Sign-out
    // ==========================================

    /// End the session. The server is notified best-effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        let _guard = self.transition.lock().await;

        let access_token = self.current_access_token().await;
        match self.current_refresh_token().await {
            Some(refresh_token) => {
                if let Err(e) = self
                    .auth
                    .logout(access_token.as_deref(), &refresh_token)
                    .await
                {
                    warn!(error = %e, "Server logout failed, clearing local session anyway");
                }
            }
            None => debug!("No refresh token, skipping server logout"),
        }

        self.clear_local_session().await;
        info!("Signed out");
        self.emit(SessionEvent::SignedOut);
    }

    /// Permanently delete the account, then clear the session like
    /// [`logout`](Self::logout). Password accounts must confirm with their
    /// password; on failure nothing changes locally.
    pub async fn delete_account(&self, password: Option<&str>) -> Result<()> {
        let _guard = self.transition.lock().await;
        self.ensure_authenticated("delete the account")?;

        let access_token = self.current_access_token().await.ok_or_else(|| {
            AuthError::ReauthenticationRequired("Please sign in again".to_string())
        })?;

        self.auth.delete_account(&access_token, password).await?;

        self.clear_local_session().await;
        info!("Account deleted");
        self.emit(SessionEvent::AccountDeleted);
        Ok(())
    }

    fn ensure_authenticated(&self, operation: &'static str) -> Result<()> {
        let state = self.state();
        if state == SessionState::Authenticated {
            Ok(())
        } else {
            Err(Error::InvalidTransition { state, operation })
        }
    }

    async fn current_access_token(&self) -> Option<String> {
        let cached = self.read().access_token.clone();
        if cached.is_some() {
            return cached;
        }
        self.tokens.access_token().await.unwrap_or_else(|e| {
            warn!(error = %e, "Cannot read access token");
            None
        })
    }

    async fn current_refresh_token(&self) -> Option<String> {
        let cached = self.read().refresh_token.clone();
        if cached.is_some() {
            return cached;
        }
        self.tokens.refresh_token().await.unwrap_or_else(|e| {
            warn!(error = %e, "Cannot read refresh token");
            None
        })
    }

    async fn clear_local_session(&self) {
        self.discard_tokens().await;
        if let Err(e) = self.ledger.clear_guest_mode().await {
            self.storage_warning("Failed to clear guest mode", e);
        }
        self.write().reset();
    }
}
