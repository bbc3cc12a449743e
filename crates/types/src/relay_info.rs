//! Per-request relay context.

use crate::{ChannelType, RelayMode};
use bon::Builder;
use secrecy::{ExposeSecret as _, SecretString};

/// Describes which channel, credential, model and streaming mode apply to one
/// relay operation.
///
/// Built once by the caller and read-only for the rest of the operation.
///
/// ```
/// use chanrelay_types::{ChannelType, RelayInfo};
///
/// let info = RelayInfo::builder()
///     .channel_type(ChannelType::Azure)
///     .api_key("azure-key")
///     .base_url("https://example.openai.azure.com")
///     .api_version("2024-02-01")
///     .upstream_model_name("gpt-4o")
///     .build();
/// assert_eq!(info.api_key(), "azure-key");
/// ```
#[derive(Debug, Builder)]
pub struct RelayInfo {
    pub channel_type: ChannelType,
    /// API key or opaque credential blob. Redacted in `Debug` output.
    #[builder(into)]
    api_key: SecretString,
    #[builder(into, default)]
    pub base_url: String,
    /// Inbound request path, including any query string.
    #[builder(into, default = "/v1/chat/completions".to_owned())]
    pub request_url_path: String,
    #[builder(into, default)]
    pub api_version: String,
    #[builder(into)]
    pub upstream_model_name: String,
    #[builder(default)]
    pub is_stream: bool,
    /// Prompt tokens precomputed by the caller.
    #[builder(default)]
    pub prompt_tokens: u64,
    #[builder(into)]
    pub organization: Option<String>,
    /// Forwarded upstream as `X-Request-Id` when present.
    #[builder(into)]
    pub request_id: Option<String>,
}

impl RelayInfo {
    /// Exposes the raw API key or credential blob.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Operation kind derived from the request path.
    #[must_use]
    pub fn relay_mode(&self) -> RelayMode {
        RelayMode::from_path(&self.request_url_path)
    }
}
