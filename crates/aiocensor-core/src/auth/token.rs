//! Expiry inspection for signed access tokens (`header.payload.signature`).
//!
//! The signature is never verified here; the server does that. Only the `exp`
//! claim of the payload is read to decide when to renew.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    /// Expiry, epoch seconds
    pub exp: i64,
}

impl AccessClaims {
    /// Decode the payload segment of an access token.
    ///
    /// Returns `None` for anything that is not three dot-separated segments with a
    /// base64url JSON payload carrying a numeric `exp`.
    pub fn decode(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return None;
        };
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Seconds left before expiry at `now`; negative once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        Duration::seconds(self.exp - now.timestamp())
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Utc::now())
    }

    /// Whether the token should be renewed at `now` given the skew threshold.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.remaining_at(now) < skew
    }
}
