//! Pre-call and post-call hooks for protected requests.
//!
//! The request hook renews an access token that is about to expire and attaches
//! it as a bearer credential. The response hook reacts to `401` by refreshing
//! once, and asks for the login screen when that fails.

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::auth::{AccessClaims, SessionEvent, SessionManager};

pub struct RequestInterceptor {
    manager: Arc<SessionManager>,
}

impl RequestInterceptor {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Prepare the headers of an outgoing call.
    ///
    /// Without a session the call goes out anonymously. A token that cannot be
    /// decoded is renewed like an expiring one.
    pub async fn before(&self, headers: &mut HeaderMap) {
        let Some(token) = self.manager.access_token() else {
            return;
        };

        let renew = match AccessClaims::decode(&token) {
            Some(claims) => claims.needs_refresh_at(Utc::now(), self.manager.refresh_skew()),
            None => {
                warn!("Access token has no readable expiry, renewing it");
                true
            }
        };
        if renew {
            debug!("Access token close to expiry, refreshing before the call");
            if let Err(e) = self.manager.refresh().await {
                debug!(error = %e, "Pre-emptive refresh failed");
            }
        }

        // Re-read: the refresh may have replaced or dropped the token
        let Some(token) = self.manager.access_token() else {
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                headers.insert(header::AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Access token is not a valid header value"),
        }
    }
}

/// What the response hook did with a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    /// Not an authorization failure
    PassThrough,
    /// 401 answered by a successful refresh; the call itself is not retried
    Refreshed,
    /// 401 while another refresh was outstanding; left to that refresh
    RefreshInFlight,
    /// 401 and the refresh failed; the session is gone
    LoginRequired,
}

pub struct ResponseInterceptor {
    manager: Arc<SessionManager>,
}

impl ResponseInterceptor {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub async fn after(&self, status: StatusCode) -> ResponseAction {
        if status != StatusCode::UNAUTHORIZED {
            return ResponseAction::PassThrough;
        }
        if self.manager.is_refreshing() {
            debug!("401 while a refresh is in flight, passing through");
            return ResponseAction::RefreshInFlight;
        }

        match self.manager.refresh().await {
            Ok(()) => ResponseAction::Refreshed,
            Err(e) => {
                warn!(error = %e, "Session could not be renewed after 401");
                // Already logged out by the failed refresh
                self.manager.logout();
                self.manager.notify(SessionEvent::LoginRequired);
                ResponseAction::LoginRequired
            }
        }
    }
}
