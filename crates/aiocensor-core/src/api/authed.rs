//! Authenticated HTTP client for protected console endpoints.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::interceptor::{RequestInterceptor, ResponseAction, ResponseInterceptor};
use super::{ApiClient, ApiError};
use crate::auth::SessionManager;

/// Client for protected calls.
///
/// Every call runs the request hook before dispatch and the response hook once
/// the response arrives. A `401` is still returned to the caller as
/// [`ApiError::Unauthorized`]; it is never retried here.
pub struct AuthedClient {
    api: ApiClient,
    manager: Arc<SessionManager>,
    requests: RequestInterceptor,
    responses: ResponseInterceptor,
}

impl AuthedClient {
    pub fn new(api: ApiClient, manager: Arc<SessionManager>) -> Self {
        Self {
            requests: RequestInterceptor::new(manager.clone()),
            responses: ResponseInterceptor::new(manager.clone()),
            api,
            manager,
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Start a request to a path on the console backend.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.api.http().request(method, self.api.url(path)?))
    }

    /// Send a request through both hooks and return the raw response.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let mut request = builder.build()?;
        self.requests.before(request.headers_mut()).await;

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.api.http().execute(request).await?;

        match self.responses.after(response.status()).await {
            ResponseAction::PassThrough => {}
            action => info!(?action, "Authorization failure handled"),
        }
        Ok(response)
    }

    /// Like [`send`](Self::send), turning error statuses into [`ApiError`].
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.send(builder).await?;
        ApiClient::check_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path)?).await?;
        Self::parse(path, response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.request(Method::POST, path)?.json(body))
            .await?;
        Self::parse(path, response).await
    }

    async fn parse<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {path} response: {e}")))
    }
}
