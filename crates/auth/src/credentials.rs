//! Service account key parsing.
//!
//! The credential blob handed to the token cache is the JSON key file a cloud
//! console exports for a service account. Only the fields needed for the
//! JWT-bearer grant are read.

use chanrelay_types::{RelayError, traits::Result};
use serde::Deserialize;

/// Google OAuth 2.0 token endpoint, used when the key omits `token_uri`.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Minimal service account fields required to sign a token request.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a service account JSON blob.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidCredential`] if the blob is not JSON or
    /// lacks `client_email` / `private_key`.
    pub fn from_json(blob: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(blob.trim()).map_err(|e| {
            RelayError::InvalidCredential(format!("invalid service account JSON: {e}"))
        })?;
        if key.client_email.trim().is_empty() {
            return Err(RelayError::InvalidCredential(
                "service account is missing client_email".into(),
            ));
        }
        if key.private_key.trim().is_empty() {
            return Err(RelayError::InvalidCredential(
                "service account is missing private_key".into(),
            ));
        }
        Ok(key)
    }

    /// Token endpoint declared by the key, or Google's default.
    #[must_use]
    pub fn token_uri(&self) -> &str {
        self.token_uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}
