use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::SessionError;
use super::storage::SessionSlot;

/// Current session payload. Persisted as `{isAuthenticated, accessToken, refreshToken}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Session for a token pair just accepted by login or refresh.
    pub fn authenticated(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            is_authenticated: true,
            access_token: Some(access_token),
            refresh_token,
        }
    }

    /// The zero session: logged out, no tokens.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Get the bearer token if the session is authenticated
    pub fn token(&self) -> Option<&str> {
        if self.is_authenticated {
            self.access_token.as_deref()
        } else {
            None
        }
    }

    /// A session flagged authenticated without an access token is treated as
    /// logged out.
    fn normalized(mut self) -> Self {
        if self.is_authenticated && self.access_token.is_none() {
            self.is_authenticated = false;
        }
        self
    }
}

/// Durable mirror of the session in a single named slot.
pub struct TokenStore {
    slot: Box<dyn SessionSlot>,
}

impl TokenStore {
    pub fn new(slot: impl SessionSlot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
        }
    }

    pub fn from_boxed(slot: Box<dyn SessionSlot>) -> Self {
        Self { slot }
    }

    /// Load the persisted session.
    ///
    /// An empty, unreadable or unparseable slot yields the zero session.
    pub fn load(&self) -> Session {
        match self.try_load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!(error = %e, "Ignoring stored session");
                Session::anonymous()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Session>, SessionError> {
        let contents = self
            .slot
            .read()
            .map_err(|e| SessionError::StorageCorrupt(format!("{e:#}")))?;
        let Some(contents) = contents else {
            debug!("No stored session");
            return Ok(None);
        };
        let session: Session = serde_json::from_str(&contents)
            .map_err(|e| SessionError::StorageCorrupt(e.to_string()))?;
        Ok(Some(session.normalized()))
    }

    /// Replace the persisted session.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let contents = serde_json::to_string(session)
            .map_err(|e| SessionError::StorageUnavailable(e.to_string()))?;
        self.slot
            .write(&contents)
            .map_err(|e| SessionError::StorageUnavailable(format!("{e:#}")))
    }

    /// Remove the persisted session entirely.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.slot
            .remove()
            .map_err(|e| SessionError::StorageUnavailable(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{FileSlot, MemorySlot};

    #[test]
    fn test_load_empty_slot_is_anonymous() {
        let store = TokenStore::new(MemorySlot::new());
        assert_eq!(store.load(), Session::anonymous());
    }

    #[test]
    fn test_load_malformed_slot_is_anonymous() {
        for contents in ["", "not json", "{\"isAuthenticated\": \"yes\"}", "[1, 2]"] {
            let store = TokenStore::new(MemorySlot::with_contents(contents));
            assert_eq!(store.load(), Session::anonymous(), "contents: {contents:?}");
        }
    }

    #[test]
    fn test_save_then_load_returns_same_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(FileSlot::new(dir.path()));
        let sessions = [
            Session::anonymous(),
            Session::authenticated("a.b.c".to_string(), Some("refresh".to_string())),
            Session::authenticated("a.b.c".to_string(), None),
        ];

        for session in sessions {
            store.save(&session).unwrap();
            assert_eq!(store.load(), session);
        }
    }

    #[test]
    fn test_persisted_field_names() {
        let slot = MemorySlot::new();
        let store = TokenStore::new(slot.clone());
        store
            .save(&Session::authenticated("access".to_string(), Some("refresh".to_string())))
            .unwrap();

        let raw: serde_json::Value = serde_json::from_str(&slot.read().unwrap().unwrap()).unwrap();
        assert_eq!(raw["isAuthenticated"], true);
        assert_eq!(raw["accessToken"], "access");
        assert_eq!(raw["refreshToken"], "refresh");
    }

    #[test]
    fn test_load_authenticated_without_token_is_anonymous() {
        let store = TokenStore::new(MemorySlot::with_contents(
            r#"{"isAuthenticated": true, "accessToken": null, "refreshToken": "r"}"#,
        ));
        let session = store.load();
        assert!(!session.is_authenticated);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_clear_removes_slot() {
        let slot = MemorySlot::new();
        let store = TokenStore::new(slot.clone());
        store
            .save(&Session::authenticated("access".to_string(), None))
            .unwrap();

        store.clear().unwrap();

        assert!(slot.is_empty());
        assert_eq!(store.load(), Session::anonymous());
    }
}
