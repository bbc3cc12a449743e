//! Unified error type for the chanrelay workspace.

use serde_json::{Value, json};
use thiserror::Error;

/// Enumerates all error kinds that can occur while relaying one request.
///
/// Resolution-stage variants (`InvalidInput`, `InvalidCredential`,
/// `ModelNotFound`) are raised before any network call is attempted.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request was absent or malformed before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A credential could not be parsed or was rejected locally.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The requested model has no mapping for the selected provider.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The OAuth token endpoint refused or failed the refresh.
    #[error("token fetch failed: {0}")]
    TokenFetch(String),

    /// The upstream provider returned a non-success status or a malformed body.
    #[error("upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },

    /// Network or connection failure, passed through from the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The relay operation was cancelled by the caller.
    #[error("relay cancelled")]
    Cancelled,
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "rquest")]
impl From<rquest::Error> for RelayError {
    fn from(e: rquest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl RelayError {
    /// Returns `true` if the error is likely transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Transport(_) | Self::TokenFetch(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if the error was raised before any upstream call.
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidCredential(_)
                | Self::ModelNotFound(_)
                | Self::Config(_)
        )
    }

    /// Returns `(status, error_type, error_code)` for this error.
    #[must_use]
    pub fn classify(&self) -> (u16, &'static str, &'static str) {
        match self {
            Self::InvalidInput(_) | Self::Serialization(_) => {
                (400, "invalid_request_error", "invalid_request")
            }
            Self::InvalidCredential(_) => (401, "authentication_error", "invalid_api_key"),
            Self::ModelNotFound(_) => (404, "invalid_request_error", "model_not_found"),
            Self::TokenFetch(_) => (502, "authentication_error", "token_fetch_failed"),
            Self::Upstream { status, .. } => classify_upstream(*status),
            Self::Transport(_) => (502, "server_error", "upstream_error"),
            Self::Config(_) => (500, "server_error", "internal_error"),
            Self::Cancelled => (499, "server_error", "request_cancelled"),
        }
    }

    /// Status-like code surfaced to the caller.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.classify().0
    }

    /// Renders the error as an OpenAI-style error envelope.
    #[must_use]
    pub fn to_error_body(&self) -> Value {
        let (_, error_type, error_code) = self.classify();
        let message = match self {
            Self::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        };
        json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": error_code,
            }
        })
    }
}

fn classify_upstream(status: u16) -> (u16, &'static str, &'static str) {
    match status {
        429 => (429, "rate_limit_error", "rate_limit_exceeded"),
        401 => (401, "authentication_error", "invalid_api_key"),
        403 => (403, "permission_error", "insufficient_quota"),
        400..=499 => (status, "invalid_request_error", "upstream_error"),
        _ => (status, "server_error", "upstream_error"),
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RelayError>;
