use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wouldyou_auth::{
    AppleCredential, AuthApi, AuthClient, AuthClientOptions, AuthError, ErrorCode,
};

fn auth_body() -> serde_json::Value {
    json!({
        "access_token": "test_access_token",
        "refresh_token": "test_refresh_token",
        "user": { "id": "test_user_id", "email": "test@example.com" }
    })
}

fn client(uri: &str) -> AuthClient {
    AuthClient::new(uri, reqwest::Client::new(), AuthClientOptions::default())
}

#[tokio::test]
async fn test_register() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({ "email": "a@b.com", "password": "password123" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_body()))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri())
        .register("a@b.com", "password123")
        .await;

    assert!(result.is_ok());
    if let Ok(response) = result {
        assert_eq!(response.access_token, "test_access_token");
        assert_eq!(response.user.id, "test_user_id");
    }
}

#[tokio::test]
async fn test_register_email_taken() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": true,
            "message": "email already registered"
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .register("a@b.com", "password123")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::EmailTaken);
    assert_eq!(
        err.user_message("Registration failed. Please try again."),
        "email already registered"
    );
}

#[tokio::test]
async fn test_register_rejected_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": true,
            "message": "email required and password must be at least 8 characters"
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .register("a@b.com", "password123")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::WeakPassword(_)));
}

#[tokio::test]
async fn test_register_short_password_never_hits_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .register("a@b.com", "short")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": true,
            "message": "invalid email or password"
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .login("a@b.com", "wrong-password")
        .await
        .unwrap_err();

    match err {
        AuthError::InvalidCredentials(message) => {
            assert_eq!(message, "invalid email or password")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_login_server_error_uses_fallback_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(502).set_body_string(""))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .login("a@b.com", "password123")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ApiError { status: 502, .. }));
    assert_eq!(
        err.user_message("Login failed. Please try again."),
        "Login failed. Please try again."
    );
}

#[tokio::test]
async fn test_login_network_error() {
    // Nothing listens on the discard port
    let auth = client("http://127.0.0.1:9");

    let err = auth.login("a@b.com", "password123").await.unwrap_err();

    assert!(err.code().is_retryable());
}

#[tokio::test]
async fn test_login_with_apple() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/apple"))
        .and(body_json(json!({
            "identity_token": "apple.jwt.token",
            "authorization_code": "code-123",
            "full_name": "Test User"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .mount(&mock_server)
        .await;

    let credential = AppleCredential {
        identity_token: "apple.jwt.token".to_string(),
        authorization_code: "code-123".to_string(),
        full_name: Some("Test User".to_string()),
        email: None,
    };

    let response = client(&mock_server.uri())
        .login_with_apple(&credential)
        .await
        .unwrap();

    assert_eq!(response.refresh_token, "test_refresh_token");
}

#[tokio::test]
async fn test_login_with_apple_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/apple"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": true,
            "message": "invalid Apple identity token"
        })))
        .mount(&mock_server)
        .await;

    let credential = AppleCredential {
        identity_token: "bad".to_string(),
        authorization_code: "code".to_string(),
        ..Default::default()
    };

    let err = client(&mock_server.uri())
        .login_with_apple(&credential)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidAppleCredential);
}

#[tokio::test]
async fn test_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "old_refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .mount(&mock_server)
        .await;

    let response = client(&mock_server.uri())
        .refresh("old_refresh")
        .await
        .unwrap();

    assert_eq!(response.access_token, "test_access_token");
}

#[tokio::test]
async fn test_logout_sends_bearer_and_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("Authorization", "Bearer access"))
        .and(body_json(json!({ "refresh_token": "refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Logged out successfully"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri())
        .logout(Some("access"), "refresh")
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_delete_account_requires_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/auth/account"))
        .and(body_json(json!({ "password": "" })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": true,
            "message": "Incorrect password"
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .delete_account("access", None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ReauthenticationRequired(ref m) if m == "Incorrect password"));
}

#[tokio::test]
async fn test_validate_session_non_ok_status_is_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let validity = client(&mock_server.uri()).validate_session("token").await;

    assert!(!validity.valid);
}

#[tokio::test]
async fn test_validate_session_unexpected_body_is_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "degraded" })))
        .mount(&mock_server)
        .await;

    let validity = client(&mock_server.uri()).validate_session("token").await;

    assert!(!validity.valid);
}

#[tokio::test]
async fn test_validate_session_timeout_is_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let options = AuthClientOptions::default().with_validate_timeout(Duration::from_millis(100));
    let auth = AuthClient::new(&mock_server.uri(), reqwest::Client::new(), options);

    let validity = auth.validate_session("token").await;

    assert!(!validity.valid);
}

#[tokio::test]
async fn test_fetch_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "test_user_id",
            "email": "test@example.com"
        })))
        .mount(&mock_server)
        .await;

    let user = client(&mock_server.uri()).fetch_user("access").await.unwrap();

    assert_eq!(user.id, "test_user_id");
    assert_eq!(user.email, "test@example.com");
}
