//! Access token representation and expiry logic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A fetched OAuth access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Unix timestamp (seconds) at which the token stops being accepted.
    pub expires_at: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl AccessToken {
    /// Create a token expiring at the given unix timestamp.
    pub fn new(access_token: impl Into<String>, expires_at: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Create a token expiring `expires_in_secs` seconds from now. Lifetimes
    /// past the end of the clock saturate at `u64::MAX`.
    pub fn expiring_in(access_token: impl Into<String>, expires_in_secs: u64) -> Self {
        Self::new(access_token, now_secs().saturating_add(expires_in_secs))
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        Duration::from_secs(self.expires_at.saturating_sub(now_secs()))
    }

    /// `true` if the token expires within `margin` from now.
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.remaining() <= margin
    }

    /// `true` once the expiry timestamp has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }
}
