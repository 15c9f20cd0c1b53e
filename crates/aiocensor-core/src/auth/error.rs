use thiserror::Error;

/// Shown when the authenticator gives no reason, and for transport failures during login.
pub const DEFAULT_LOGIN_FAILURE: &str =
    "Login request failed, check your network or try again later";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The authenticator rejected the password. Carries its message, if any.
    #[error("Credentials rejected{}", reason_suffix(.0))]
    CredentialRejected(Option<String>),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A protected call came back with 401.
    #[error("Access token expired or invalid")]
    TokenExpiredOrInvalid,

    #[error("Refresh token rejected")]
    RefreshRejected,

    #[error("Stored session is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

impl SessionError {
    /// Message suitable for showing on the login screen.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::CredentialRejected(Some(message)) if !message.is_empty() => {
                message.clone()
            }
            SessionError::CredentialRejected(_) | SessionError::TransportFailure(_) => {
                DEFAULT_LOGIN_FAILURE.to_string()
            }
            SessionError::TokenExpiredOrInvalid | SessionError::RefreshRejected => {
                "Your session has expired, please sign in again".to_string()
            }
            SessionError::StorageCorrupt(_) | SessionError::StorageUnavailable(_) => {
                "Could not access the saved session".to_string()
            }
        }
    }

    /// Whether this error ends the session and sends the user back to login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            SessionError::TokenExpiredOrInvalid | SessionError::RefreshRejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = SessionError::CredentialRejected(Some("Wrong password".to_string()));
        assert_eq!(err.user_message(), "Wrong password");
    }

    #[test]
    fn test_user_message_falls_back_to_default() {
        assert_eq!(
            SessionError::CredentialRejected(None).user_message(),
            DEFAULT_LOGIN_FAILURE
        );
        assert_eq!(
            SessionError::CredentialRejected(Some(String::new())).user_message(),
            DEFAULT_LOGIN_FAILURE
        );
        assert_eq!(
            SessionError::TransportFailure("connection refused".to_string()).user_message(),
            DEFAULT_LOGIN_FAILURE
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SessionError::CredentialRejected(Some("nope".to_string())).to_string(),
            "Credentials rejected: nope"
        );
        assert_eq!(
            SessionError::CredentialRejected(None).to_string(),
            "Credentials rejected"
        );
        assert_eq!(
            SessionError::RefreshRejected.to_string(),
            "Refresh token rejected"
        );
    }

    #[test]
    fn test_requires_login() {
        assert!(SessionError::RefreshRejected.requires_login());
        assert!(SessionError::TokenExpiredOrInvalid.requires_login());
        assert!(!SessionError::TransportFailure("timeout".to_string()).requires_login());
        assert!(!SessionError::CredentialRejected(None).requires_login());
    }
}
