//! Fakes and fixtures shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;

use crate::api::{ApiError, AuthApi, LoginResponse, RefreshResponse};
use crate::auth::{MemorySlot, Session, SessionManager, SessionSlot, TokenStore};

/// Suspension points inside each fake exchange, standing in for network I/O.
const EXCHANGE_YIELDS: usize = 3;

/// Access token whose payload is the given JSON.
pub fn token_with_payload(payload: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

/// Access token expiring `secs` seconds from now.
pub fn token_expiring_in(secs: i64) -> String {
    token_with_payload(&format!(r#"{{"exp":{}}}"#, Utc::now().timestamp() + secs))
}

/// Slot holding an authenticated session whose access token expires in `secs`.
/// The refresh token is `refresh-1`.
pub fn authenticated_slot(secs: i64) -> MemorySlot {
    let slot = MemorySlot::new();
    TokenStore::new(slot.clone())
        .save(&Session::authenticated(
            token_expiring_in(secs),
            Some("refresh-1".to_string()),
        ))
        .unwrap();
    slot
}

pub fn manager_with(api: &Arc<FakeApi>, slot: MemorySlot) -> Arc<SessionManager> {
    let api: Arc<dyn AuthApi> = api.clone();
    Arc::new(SessionManager::new(api, TokenStore::new(slot)))
}

/// Slot that reads from a shared [`MemorySlot`] but refuses every write.
pub struct ReadOnlySlot(pub MemorySlot);

impl SessionSlot for ReadOnlySlot {
    fn read(&self) -> anyhow::Result<Option<String>> {
        self.0.read()
    }

    fn write(&self, _contents: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    fn remove(&self) -> anyhow::Result<()> {
        self.0.remove()
    }
}

/// Scripted reply of the fake authenticator.
#[derive(Debug, Clone)]
pub enum Reply {
    Grant {
        access: String,
        refresh: Option<String>,
    },
    /// `success: false`, with an optional message
    Reject(Option<String>),
    /// HTTP 401
    Unauthorized,
    /// The request never completed
    Unreachable,
}

impl Reply {
    pub fn grant(access: &str, refresh: &str) -> Self {
        Reply::Grant {
            access: access.to_string(),
            refresh: Some(refresh.to_string()),
        }
    }

    fn into_result(self) -> Result<LoginResponse, ApiError> {
        match self {
            Reply::Grant { access, refresh } => Ok(LoginResponse {
                success: true,
                access_token: Some(access),
                refresh_token: refresh,
                message: None,
            }),
            Reply::Reject(message) => Ok(LoginResponse {
                success: false,
                message,
                ..Default::default()
            }),
            Reply::Unauthorized => Err(ApiError::Unauthorized),
            Reply::Unreachable => Err(ApiError::ServerError("connection refused".to_string())),
        }
    }
}

/// In-memory authenticator recording every exchange it receives.
pub struct FakeApi {
    login_reply: Mutex<Reply>,
    refresh_reply: Mutex<Reply>,
    passwords: Mutex<Vec<String>>,
    refresh_tokens: Mutex<Vec<String>>,
    refresh_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            login_reply: Mutex::new(Reply::Reject(None)),
            refresh_reply: Mutex::new(Reply::Reject(None)),
            passwords: Mutex::new(Vec::new()),
            refresh_tokens: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_login(&self, reply: Reply) {
        *self.login_reply.lock().unwrap() = reply;
    }

    pub fn set_refresh(&self, reply: Reply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    pub fn passwords(&self) -> Vec<String> {
        self.passwords.lock().unwrap().clone()
    }

    pub fn refresh_tokens(&self) -> Vec<String> {
        self.refresh_tokens.lock().unwrap().clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

async fn suspend() {
    for _ in 0..EXCHANGE_YIELDS {
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn login(&self, password: &str) -> Result<LoginResponse, ApiError> {
        self.passwords.lock().unwrap().push(password.to_string());
        suspend().await;
        let reply = self.login_reply.lock().unwrap().clone();
        reply.into_result()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        suspend().await;
        let reply = self.refresh_reply.lock().unwrap().clone();
        reply.into_result().map(|response| RefreshResponse {
            success: response.success,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }
}
