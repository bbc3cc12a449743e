//! Service account JWT-bearer grant (RFC 7523).
//!
//! A short-lived assertion is signed with the account's RSA key and exchanged
//! at the key's `token_uri` for an OAuth access token.

use crate::credentials::ServiceAccountKey;
use async_trait::async_trait;
use chanrelay_types::{AccessToken, RelayError, TokenFetcher, traits::Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Scope requested for Vertex AI calls.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// OAuth grant type for signed assertions.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion, the maximum Google accepts.
const ASSERTION_TTL_SECS: u64 = 3600;

/// Fallback when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Sign a JWT-bearer assertion for `key`, issued at `now` (unix seconds).
///
/// # Errors
///
/// Returns [`RelayError::InvalidCredential`] if the private key is not a
/// valid RSA PEM.
pub fn sign_assertion(key: &ServiceAccountKey, scope: &str, now: u64) -> Result<String> {
    let encoding = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| RelayError::InvalidCredential(format!("invalid private key: {e}")))?;
    let mut header = Header::new(Algorithm::RS256);
    header.kid.clone_from(&key.private_key_id);
    let claims = Claims {
        iss: &key.client_email,
        scope,
        aud: key.token_uri(),
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };
    jsonwebtoken::encode(&header, &claims, &encoding)
        .map_err(|e| RelayError::InvalidCredential(format!("failed to sign assertion: {e}")))
}

/// Build the form parameters for the token exchange request.
#[must_use]
pub fn token_form_params(assertion: &str) -> Vec<(String, String)> {
    vec![
        ("grant_type".into(), JWT_BEARER_GRANT.into()),
        ("assertion".into(), assertion.into()),
    ]
}

/// Parse the token endpoint JSON response into an [`AccessToken`].
///
/// # Errors
///
/// Returns [`RelayError::TokenFetch`] if the response is missing `access_token`.
pub fn parse_token_response(json: &serde_json::Value) -> Result<AccessToken> {
    let access_token = json
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RelayError::TokenFetch("missing access_token".into()))?;
    let expires_in = json
        .get("expires_in")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(DEFAULT_EXPIRES_IN);
    Ok(AccessToken::expiring_in(access_token, expires_in))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// [`TokenFetcher`] that performs the service account grant over HTTP.
#[derive(Clone)]
pub struct ServiceAccountFetcher {
    http: rquest::Client,
    scope: String,
}

impl ServiceAccountFetcher {
    pub fn new(http: rquest::Client) -> Self {
        Self {
            http,
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
        }
    }

    /// Override the requested scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[async_trait]
impl TokenFetcher for ServiceAccountFetcher {
    async fn fetch(&self, credential: &str) -> Result<AccessToken> {
        let key = ServiceAccountKey::from_json(credential)?;
        let assertion = sign_assertion(&key, &self.scope, now_secs())?;
        let token_uri = key.token_uri();

        tracing::debug!(account = %key.client_email, %token_uri, "requesting access token");
        let resp = self
            .http
            .post(token_uri)
            .form(&token_form_params(&assertion))
            .send()
            .await
            .map_err(|e| RelayError::TokenFetch(format!("token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::TokenFetch(format!(
                "token endpoint returned {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RelayError::TokenFetch(format!("failed to parse token response: {e}")))?;
        parse_token_response(&json)
    }
}
