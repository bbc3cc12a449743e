//! Upstream URL composition shared by the provider adaptors.

use chanrelay_types::ChannelType;

/// Base URL prefix of Cloudflare AI Gateway deployments.
pub const CLOUDFLARE_GATEWAY: &str = "https://gateway.ai.cloudflare.com";

/// Join a base URL and a request path.
///
/// Plain concatenation, except behind Cloudflare AI Gateway where the gateway
/// already encodes the provider prefix: OpenAI paths lose a leading `/v1` and
/// Azure paths lose a leading `/openai/deployments`.
#[must_use]
pub fn full_request_url(base_url: &str, path: &str, channel: ChannelType) -> String {
    if base_url.starts_with(CLOUDFLARE_GATEWAY) {
        let trimmed = match channel {
            ChannelType::OpenAI => path.strip_prefix("/v1").unwrap_or(path),
            ChannelType::Azure => path.strip_prefix("/openai/deployments").unwrap_or(path),
            _ => path,
        };
        return format!("{base_url}{trimmed}");
    }
    format!("{base_url}{path}")
}

/// Azure deployment names cannot contain `.`, so `gpt-3.5-turbo` is deployed
/// as `gpt-35-turbo`.
#[must_use]
pub fn sanitize_deployment(model: &str) -> String {
    model.replace('.', "")
}

/// Build the Azure deployment path for an OpenAI-style request path.
///
/// `/v1/chat/completions?x=1` with model `gpt-4.turbo` and version
/// `2024-02-01` becomes
/// `/openai/deployments/gpt-4turbo/chat/completions?api-version=2024-02-01`.
#[must_use]
pub fn azure_deployment_path(request_path: &str, api_version: &str, model: &str) -> String {
    let path = request_path.split('?').next().unwrap_or_default();
    let with_version = format!("{path}?api-version={api_version}");
    let task = with_version.strip_prefix("/v1/").unwrap_or(&with_version);
    format!("/openai/deployments/{}/{task}", sanitize_deployment(model))
}

/// Substitute every `{model}` placeholder in a templated base URL.
#[must_use]
pub fn fill_model_template(template: &str, model: &str) -> String {
    template.replace("{model}", model)
}
