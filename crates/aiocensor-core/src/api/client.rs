//! API client for the console authentication endpoints.
//!
//! This module provides the `ApiClient` struct which talks to the remote
//! authenticator. Protected calls go through [`super::AuthedClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ApiError, AuthApi, LoginResponse, RefreshResponse};
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/api/login";

const REFRESH_PATH: &str = "/api/refresh";

/// API client for the console backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self { client, base_url })
    }

    /// Client for a local test backend, bypassing any proxy from the environment.
    #[cfg(test)]
    pub(crate) fn local(base_url: &str) -> Self {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        Self {
            client,
            base_url: Url::parse(base_url).unwrap(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    /// The underlying HTTP client, shared with [`super::AuthedClient`].
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Resolve a path against the base URL. Paths that resolve to another
    /// origin are rejected so the bearer token never leaves the backend.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid path {path}: {e}")))?;
        if url.origin() != self.base_url.origin() {
            return Err(ApiError::InvalidRequest(format!(
                "{path} is not on {}",
                self.base_url.origin().ascii_serialization()
            )));
        }
        Ok(url)
    }

    /// Check if response is successful, returning an error with body if not.
    pub(crate) async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {path} response: {e}")))
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, password: &str) -> Result<LoginResponse, ApiError> {
        debug!("Sending login request");
        self.post(LOGIN_PATH, &json!({ "password": password })).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        debug!("Sending refresh request");
        self.post(REFRESH_PATH, &json!({ "refresh_token": refresh_token }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_paths() {
        let client = ApiClient::new("http://127.0.0.1:8000", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url(LOGIN_PATH).unwrap().as_str(),
            "http://127.0.0.1:8000/api/login"
        );
        assert_eq!(
            client.url("/api/blacklist?page=2").unwrap().as_str(),
            "http://127.0.0.1:8000/api/blacklist?page=2"
        );
    }

    #[test]
    fn test_url_rejects_other_origins() {
        let client = ApiClient::new("http://127.0.0.1:8000", Duration::from_secs(5)).unwrap();
        for path in [
            "https://other.host/x",
            "//other.host/x",
            "http://127.0.0.1:9000/api/audit",
            "https://127.0.0.1:8000/api/audit",
        ] {
            assert!(
                matches!(client.url(path), Err(ApiError::InvalidRequest(_))),
                "{path} should be rejected"
            );
        }
        assert!(client.url("http://127.0.0.1:8000/api/audit").is_ok());
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_parse_login_response() {
        let ok: LoginResponse = serde_json::from_str(
            r#"{"success": true, "access_token": "a.b.c", "refresh_token": "r"}"#,
        )
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.access_token.as_deref(), Some("a.b.c"));
        assert_eq!(ok.message, None);

        let rejected: LoginResponse =
            serde_json::from_str(r#"{"success": false, "message": "Wrong password"}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.message.as_deref(), Some("Wrong password"));
        assert_eq!(rejected.access_token, None);
    }

    #[test]
    fn test_parse_refresh_response() {
        let rejected: RefreshResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.refresh_token, None);
    }
}
