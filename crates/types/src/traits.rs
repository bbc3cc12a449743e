//! Collaborator boundaries shared across all chanrelay crates.
//!
//! The adaptor layer never talks to the network or a tokenizer directly; it
//! goes through these traits so the surrounding layers can supply their own
//! transport, token-counting and credential services.

use crate::{AccessToken, RelayError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use http::{HeaderMap, Method};
use std::pin::Pin;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RelayError>;

/// A pinned, sendable stream of response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A fully-formed outbound request handed to the transport.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The raw response returned by the transport.
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl UpstreamResponse {
    /// Wraps an already-buffered body as a single-chunk stream.
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers: HeaderMap::new(),
            body: Box::pin(futures_util::stream::once(async move { Ok(body) })),
        }
    }

    /// `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues outbound HTTP calls. Retries, proxies and timeouts belong here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] on connection-level failures. A
    /// non-2xx status is *not* an error at this layer.
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// Estimates token counts for completed text.
///
/// Implementations must be pure (no I/O) and deterministic for a given input.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens `model` would use for `text`.
    fn count(&self, text: &str, model: &str) -> u64;
}

/// Exchanges an opaque credential blob for a fresh access token.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    /// Fetch a new token for `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidCredential`] if the blob cannot be parsed
    /// and [`RelayError::TokenFetch`] if the token endpoint fails.
    async fn fetch(&self, credential: &str) -> Result<AccessToken>;
}
