//! Remote auth client for the Would You Rather backend
//!
//! Stateless request/response wrappers around the `/auth/*` and `/health`
//! endpoints. Nothing here keeps tokens or user state; that is the job of
//! the session manager sitting on top of this crate.

mod error;
mod types;
mod validation;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub use error::{AuthError, ErrorCode, Result};
pub use types::{AppleCredential, AuthResponse, Credentials, SessionValidity, User};
pub use validation::{validate_login, validate_registration, MIN_PASSWORD_LENGTH};

use error::server_message;
use types::{DeleteAccountBody, HealthResponse, RefreshTokenBody};

const CLIENT_INFO: &str = concat!("wouldyou-auth/", env!("CARGO_PKG_VERSION"));

/// Operations against the auth backend.
///
/// [`AuthClient`] is the HTTP implementation; the session manager only
/// depends on this trait so it can be driven by any transport.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// `POST /auth/register`
    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// `POST /auth/apple`
    async fn login_with_apple(&self, credential: &AppleCredential) -> Result<AuthResponse>;

    /// `POST /auth/refresh`
    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse>;

    /// `POST /auth/logout`. Server-side revocation is best-effort; callers
    /// should not let a failure here block local cleanup.
    async fn logout(&self, access_token: Option<&str>, refresh_token: &str) -> Result<()>;

    /// `DELETE /auth/account`
    async fn delete_account(&self, access_token: &str, password: Option<&str>) -> Result<()>;

    /// Lightweight probe used at startup. Never fails: anything other than a
    /// healthy response within the validation timeout is `valid: false`.
    async fn validate_session(&self, access_token: &str) -> SessionValidity;

    /// `GET /auth/me`
    async fn fetch_user(&self, access_token: &str) -> Result<User>;
}

/// Options for [`AuthClient`]
#[derive(Debug, Clone)]
pub struct AuthClientOptions {
    /// Timeout applied to every request
    pub request_timeout: Option<Duration>,
    /// Upper bound for the startup session probe
    pub validate_timeout: Duration,
    /// Value of the `X-Client-Info` header
    pub client_info: String,
}

impl Default for AuthClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            validate_timeout: Duration::from_secs(5),
            client_info: CLIENT_INFO.to_string(),
        }
    }
}

impl AuthClientOptions {
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_validate_timeout(mut self, value: Duration) -> Self {
        self.validate_timeout = value;
        self
    }

    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Login,
    Register,
    Apple,
    Refresh,
    Logout,
    DeleteAccount,
    FetchUser,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Apple => "apple sign-in",
            Self::Refresh => "refresh",
            Self::Logout => "logout",
            Self::DeleteAccount => "delete account",
            Self::FetchUser => "fetch user",
        }
    }

    /// Map a non-success status to the error taxonomy
    fn classify(&self, status: StatusCode, message: String) -> AuthError {
        match (self, status.as_u16()) {
            (Self::Login | Self::Refresh, 401) => AuthError::InvalidCredentials(message),
            (Self::FetchUser, 401 | 403) => AuthError::InvalidCredentials(message),
            (Self::Register, 409) => AuthError::EmailTaken(message),
            (Self::Register, 400 | 422) => AuthError::WeakPassword(message),
            (Self::Apple, 401) => AuthError::InvalidAppleCredential(message),
            (Self::DeleteAccount, 401 | 403) => AuthError::ReauthenticationRequired(message),
            (Self::Login | Self::Apple | Self::Refresh, 400 | 422) => {
                AuthError::ValidationError(message)
            }
            (_, status) => AuthError::ApiError { status, message },
        }
    }
}

/// HTTP client for the auth endpoints
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    http_client: Client,
    options: AuthClientOptions,
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// `base_url` is the API root the `/auth/*` paths hang off, e.g.
    /// `https://api.example.com/api`.
    pub fn new(base_url: &str, http_client: Client, options: AuthClientOptions) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            options,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &AuthClientOptions {
        &self.options
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("X-Client-Info", &self.options.client_info)
            .header("Accept", "application/json");
        match self.options.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    async fn check(response: Response, op: Operation) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body);
        debug!("{} failed with status {}: {}", op.name(), status, message);
        Err(op.classify(status, message))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_auth<B: serde::Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
        op: Operation,
    ) -> Result<AuthResponse> {
        let url = self.endpoint(path)?;
        let response = self
            .prepare(self.http_client.post(url))
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, op).await?;
        Self::read_json::<AuthResponse>(response).await
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        validate_login(email, password)?;
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.send_auth("/auth/login", &credentials, Operation::Login)
            .await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse> {
        validate_registration(email, password)?;
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.send_auth("/auth/register", &credentials, Operation::Register)
            .await
    }

    async fn login_with_apple(&self, credential: &AppleCredential) -> Result<AuthResponse> {
        if credential.identity_token.is_empty() || credential.authorization_code.is_empty() {
            return Err(AuthError::InvalidAppleCredential(
                "Missing Apple identity token or authorization code".to_string(),
            ));
        }
        self.send_auth("/auth/apple", credential, Operation::Apple)
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let body = RefreshTokenBody { refresh_token };
        self.send_auth("/auth/refresh", &body, Operation::Refresh)
            .await
    }

    async fn logout(&self, access_token: Option<&str>, refresh_token: &str) -> Result<()> {
        let url = self.endpoint("/auth/logout")?;
        let mut request = self
            .prepare(self.http_client.post(url))
            .json(&RefreshTokenBody { refresh_token });
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::check(response, Operation::Logout).await?;
        Ok(())
    }

    async fn delete_account(&self, access_token: &str, password: Option<&str>) -> Result<()> {
        let url = self.endpoint("/auth/account")?;
        let body = DeleteAccountBody {
            password: password.unwrap_or_default(),
        };
        let response = self
            .prepare(self.http_client.delete(url))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        Self::check(response, Operation::DeleteAccount).await?;
        Ok(())
    }

    async fn validate_session(&self, access_token: &str) -> SessionValidity {
        let url = match self.endpoint("/health") {
            Ok(url) => url,
            Err(err) => {
                warn!("Cannot build health endpoint: {}", err);
                return SessionValidity::INVALID;
            }
        };
        let probe = async {
            let response = self
                .http_client
                .get(url)
                .header("X-Client-Info", &self.options.client_info)
                .bearer_auth(access_token)
                .send()
                .await?;
            if !response.status().is_success() {
                debug!("Session probe returned status {}", response.status());
                return Ok::<bool, AuthError>(false);
            }
            let health = Self::read_json::<HealthResponse>(response).await?;
            Ok(health.status == "ok")
        };

        match tokio::time::timeout(self.options.validate_timeout, probe).await {
            Ok(Ok(valid)) => SessionValidity { valid },
            Ok(Err(err)) => {
                debug!("Session probe failed: {}", err);
                SessionValidity::INVALID
            }
            Err(_) => {
                warn!(
                    "Session probe timed out after {:?}",
                    self.options.validate_timeout
                );
                SessionValidity::INVALID
            }
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<User> {
        let url = self.endpoint("/auth/me")?;
        let response = self
            .prepare(self.http_client.get(url))
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = Self::check(response, Operation::FetchUser).await?;
        Self::read_json::<User>(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> AuthClient {
        AuthClient::new(uri, Client::new(), AuthClientOptions::default())
    }

    #[test]
    fn test_login_success() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/auth/login"))
                .and(body_json(serde_json::json!({
                    "email": "test@example.com",
                    "password": "password123"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "test_access_token",
                    "refresh_token": "test_refresh_token",
                    "user": { "id": "user-1", "email": "test@example.com" }
                })))
                .mount(&mock_server)
                .await;

            let result = client(&mock_server.uri())
                .login(" test@example.com ", "password123")
                .await;

            let response = result.unwrap();
            assert_eq!(response.access_token, "test_access_token");
            assert_eq!(response.refresh_token, "test_refresh_token");
            assert_eq!(response.user.email, "test@example.com");
        });
    }

    #[test]
    fn test_classify_status() {
        let conflict = Operation::Register.classify(StatusCode::CONFLICT, "taken".into());
        assert!(matches!(conflict, AuthError::EmailTaken(_)));

        let unauthorized = Operation::DeleteAccount.classify(StatusCode::UNAUTHORIZED, "no".into());
        assert!(matches!(unauthorized, AuthError::ReauthenticationRequired(_)));

        let server = Operation::Login.classify(StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert!(matches!(server, AuthError::ApiError { status: 500, .. }));

        let revoked = Operation::FetchUser.classify(StatusCode::UNAUTHORIZED, "expired".into());
        assert!(matches!(revoked, AuthError::InvalidCredentials(_)));

        let missing = Operation::FetchUser.classify(StatusCode::NOT_FOUND, "".into());
        assert!(matches!(missing, AuthError::ApiError { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok"
            })))
            .mount(&mock_server)
            .await;

        let auth = client(&format!("{}/", mock_server.uri()));
        assert_eq!(auth.base_url(), mock_server.uri());
        assert!(auth.validate_session("token").await.valid);
    }
}
