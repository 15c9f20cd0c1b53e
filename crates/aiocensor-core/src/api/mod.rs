//! REST API module for the AIOCENSOR console backend.
//!
//! This module provides:
//! - `AuthApi`: the remote authenticator contract (`/api/login`, `/api/refresh`)
//! - `ApiClient`: the reqwest implementation of that contract
//! - `AuthedClient`: protected calls with the request and response interceptors
//!   composed around the transport call

pub mod authed;
pub mod client;
pub mod error;
pub mod interceptor;

use async_trait::async_trait;
use serde::Deserialize;

pub use authed::AuthedClient;
pub use client::ApiClient;
pub use error::ApiError;
pub use interceptor::{RequestInterceptor, ResponseAction, ResponseInterceptor};
pub use reqwest::Method;

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/refresh`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The remote authenticator.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange the console password for a token pair.
    async fn login(&self, password: &str) -> Result<LoginResponse, ApiError>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;
}
