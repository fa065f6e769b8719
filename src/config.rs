//! Configuration options for the session manager

use std::time::Duration;

use url::Url;
use wouldyou_auth::AuthClientOptions;
use wouldyou_storage::MAX_FREE_USES;

use crate::error::{Error, Result};

/// Configuration options for the session manager
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// API root the auth endpoints hang off, e.g. `https://api.example.com/api`
    pub api_url: String,

    /// Timeout applied to every auth request
    pub request_timeout: Option<Duration>,

    /// Upper bound for the token probe run during restore
    pub validate_timeout: Duration,

    /// Free plays allowed in guest mode
    pub max_free_uses: u32,

    /// Buffer size of the state-change channel
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            validate_timeout: Duration::from_secs(5),
            max_free_uses: MAX_FREE_USES,
            event_capacity: 16,
        }
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| Error::Config(format!("{} must be a number of seconds: {}", name, e))),
        Err(_) => Ok(None),
    }
}

impl SessionOptions {
    /// Options pointing at `api_url`, everything else default
    pub fn new(api_url: &str) -> Result<Self> {
        Self::default().with_api_url(api_url)
    }

    /// Build options from environment variables.
    ///
    /// `WOULDYOU_API_URL` is required; `WOULDYOU_REQUEST_TIMEOUT_SECS`,
    /// `WOULDYOU_VALIDATE_TIMEOUT_SECS` and `WOULDYOU_MAX_FREE_USES` override
    /// the defaults when present.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("WOULDYOU_API_URL").map_err(|_| {
            Error::Config("WOULDYOU_API_URL environment variable not found".to_string())
        })?;
        let mut options = Self::new(&api_url)?;

        if let Some(timeout) = env_secs("WOULDYOU_REQUEST_TIMEOUT_SECS")? {
            options = options.with_request_timeout(Some(timeout));
        }
        if let Some(timeout) = env_secs("WOULDYOU_VALIDATE_TIMEOUT_SECS")? {
            options = options.with_validate_timeout(timeout);
        }
        if let Ok(raw) = std::env::var("WOULDYOU_MAX_FREE_USES") {
            let max = raw.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!("WOULDYOU_MAX_FREE_USES must be an integer: {}", e))
            })?;
            options = options.with_max_free_uses(max);
        }
        Ok(options)
    }

    /// Set the API root. Fails if it is not an absolute http(s) URL.
    pub fn with_api_url(mut self, value: &str) -> Result<Self> {
        let url = Url::parse(value)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "api_url must use http or https, got {}",
                url.scheme()
            )));
        }
        self.api_url = value.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the restore-time validation timeout
    pub fn with_validate_timeout(mut self, value: Duration) -> Self {
        self.validate_timeout = value;
        self
    }

    /// Set the guest quota
    pub fn with_max_free_uses(mut self, value: u32) -> Self {
        self.max_free_uses = value;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, value: usize) -> Self {
        self.event_capacity = value.max(1);
        self
    }

    pub(crate) fn auth_client_options(&self) -> AuthClientOptions {
        AuthClientOptions::default()
            .with_request_timeout(self.request_timeout)
            .with_validate_timeout(self.validate_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.max_free_uses, 3);
        assert_eq!(options.validate_timeout, Duration::from_secs(5));
        assert_eq!(options.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_api_url_validation() {
        let options = SessionOptions::new("https://api.example.com/api/").unwrap();
        assert_eq!(options.api_url, "https://api.example.com/api");

        assert!(matches!(SessionOptions::new("not a url"), Err(Error::Url(_))));
        assert!(matches!(
            SessionOptions::new("ftp://example.com"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let options = SessionOptions::default()
            .with_max_free_uses(5)
            .with_event_capacity(0)
            .with_request_timeout(None);
        assert_eq!(options.max_free_uses, 5);
        assert_eq!(options.event_capacity, 1);
        assert!(options.auth_client_options().request_timeout.is_none());
    }
}
