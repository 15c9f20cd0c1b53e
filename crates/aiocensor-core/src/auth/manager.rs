//! Session manager - login/logout, reconciliation and token refresh.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::session::{Session, TokenStore};
use crate::api::{ApiError, AuthApi};

/// Remaining access-token lifetime below which calls renew it first.
pub const DEFAULT_REFRESH_SKEW_SECS: i64 = 60;

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Authentication state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
    /// Authenticated with a refresh exchange outstanding
    Refreshing,
}

/// Transitions published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The session could not be renewed; the UI should show the login screen.
    LoginRequired,
}

/// Owner of the session and of every token store mutation.
///
/// Constructed once and shared (`Arc`) with the interceptors and the
/// navigation guard.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: TokenStore,
    session: Mutex<Session>,
    /// Held for the whole refresh exchange; a held lock is the in-flight flag.
    refresh_lock: AsyncMutex<()>,
    events: broadcast::Sender<SessionEvent>,
    refresh_skew: Duration,
}

impl SessionManager {
    /// Create a manager, restoring whatever session the store holds.
    pub fn new(api: Arc<dyn AuthApi>, store: TokenStore) -> Self {
        let session = store.load();
        debug!(
            authenticated = session.is_authenticated,
            has_refresh_token = session.refresh_token.is_some(),
            "Session loaded"
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            store,
            session: Mutex::new(session),
            refresh_lock: AsyncMutex::new(()),
            events,
            refresh_skew: Duration::seconds(DEFAULT_REFRESH_SKEW_SECS),
        }
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    pub fn refresh_skew(&self) -> Duration {
        self.refresh_skew
    }

    pub fn state(&self) -> AuthState {
        if !self.is_authenticated() {
            AuthState::Anonymous
        } else if self.is_refreshing() {
            AuthState::Refreshing
        } else {
            AuthState::Authenticated
        }
    }

    /// Snapshot of the in-memory session
    pub fn session(&self) -> Session {
        self.lock_session().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_session().is_authenticated
    }

    /// Bearer token for protected calls, if authenticated
    pub fn access_token(&self) -> Option<String> {
        self.lock_session().token().map(str::to_string)
    }

    /// Whether a refresh exchange is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist a session and, once stored, make it the in-memory session.
    ///
    /// Memory is only replaced after a successful write, so `check_auth` never
    /// rolls the process back to an older stored session.
    fn commit(&self, current: &mut Session, session: Session) -> Result<(), SessionError> {
        if let Err(e) = self.store.save(&session) {
            error!(error = %e, "Failed to persist session");
            return Err(e);
        }
        *current = session;
        Ok(())
    }

    // ===== Operations =====

    /// Sign in with the console password.
    ///
    /// On failure the session is left untouched and the error carries a
    /// user-facing message (`SessionError::user_message`).
    pub async fn login(&self, password: &str) -> Result<(), SessionError> {
        info!("Signing in");
        let response = match self.api.login(password).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized) => {
                warn!("Login rejected with 401");
                return Err(SessionError::CredentialRejected(None));
            }
            Err(e) => {
                error!(error = %e, "Login request failed");
                return Err(SessionError::TransportFailure(e.to_string()));
            }
        };

        if !response.success {
            warn!(message = ?response.message, "Login rejected");
            return Err(SessionError::CredentialRejected(response.message));
        }
        let Some(access_token) = response.access_token else {
            error!("Login succeeded without an access token");
            return Err(SessionError::TransportFailure(
                "login response has no access token".to_string(),
            ));
        };

        let session = Session::authenticated(access_token, response.refresh_token);
        self.commit(&mut self.lock_session(), session)?;
        self.notify(SessionEvent::LoggedIn);
        info!("Login successful");
        Ok(())
    }

    /// Drop the session in memory and in storage. Safe to call repeatedly.
    pub fn logout(&self) {
        let previous = std::mem::take(&mut *self.lock_session());
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        if previous != Session::anonymous() {
            info!("Logged out");
            self.notify(SessionEvent::LoggedOut);
        }
    }

    /// Re-read the stored session into memory and report whether it is
    /// authenticated. Never writes to storage.
    pub fn check_auth(&self) -> bool {
        let mut current = self.lock_session();
        *current = self.store.load();
        current.is_authenticated
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Only one exchange runs at a time. A caller arriving while one is in
    /// flight waits for it and shares its outcome without issuing a request of
    /// its own. Any failure logs the session out.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let _in_flight = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Refresh already in flight, waiting for it");
                drop(self.refresh_lock.lock().await);
                return if self.is_authenticated() {
                    Ok(())
                } else {
                    Err(SessionError::RefreshRejected)
                };
            }
        };

        let Some(refresh_token) = self.session().refresh_token else {
            warn!("No refresh token, logging out");
            self.logout();
            return Err(SessionError::RefreshRejected);
        };

        match self.exchange(&refresh_token).await {
            Ok(session) => {
                let mut current = self.lock_session();
                // A logout, or a session picked up by check_auth, while the
                // exchange was in flight wins over its result.
                if !current.is_authenticated {
                    info!("Logged out during refresh, discarding new tokens");
                    return Err(SessionError::RefreshRejected);
                }
                if current.refresh_token.as_deref() != Some(refresh_token.as_str()) {
                    info!("Session replaced during refresh, keeping it");
                    return Ok(());
                }
                let committed = self.commit(&mut current, session);
                drop(current);
                if let Err(e) = committed {
                    warn!("New tokens could not be stored, logging out");
                    self.logout();
                    return Err(e);
                }
                self.notify(SessionEvent::Refreshed);
                info!("Token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.logout();
                Err(e)
            }
        }
    }

    async fn exchange(&self, refresh_token: &str) -> Result<Session, SessionError> {
        let response = self.api.refresh(refresh_token).await.map_err(|e| match e {
            ApiError::Unauthorized => SessionError::RefreshRejected,
            e => SessionError::TransportFailure(e.to_string()),
        })?;

        if !response.success {
            return Err(SessionError::RefreshRejected);
        }
        let access_token = response
            .access_token
            .ok_or(SessionError::RefreshRejected)?;
        // Servers that do not rotate refresh tokens omit the field
        let refresh_token = response
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));
        Ok(Session::authenticated(access_token, refresh_token))
    }
}
