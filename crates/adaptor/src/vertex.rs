//! Vertex AI adaptor (OpenAI-compatible endpoint).
//!
//! The channel key is `<project>|<service-account-json>`. The project selects
//! the endpoint; the service account is exchanged for a bearer token through
//! the shared [`AccessTokenCache`].

use crate::{dispatch::Adaptor, headers, models::VERTEX_MODEL_IDS};
use async_trait::async_trait;
use chanrelay_auth::AccessTokenCache;
use chanrelay_types::{
    ChannelType, GeneralRequest, RelayError, RelayInfo, RelayMode, traits::Result,
};
use http::HeaderMap;
use std::sync::Arc;

/// Region the OpenAI-compatible endpoint is served from.
pub const LOCATION: &str = "us-central1";

/// The two halves of a Vertex channel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeKey<'a> {
    pub project_id: &'a str,
    pub credential: &'a str,
}

/// Show just enough of a secret to identify it in logs.
fn redact(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{head}***")
    }
}

/// Split `<project>|<service-account-json>`.
///
/// # Errors
///
/// Returns [`RelayError::InvalidCredential`] if the separator is missing or
/// either half is empty. The message never contains the credential.
pub fn parse_composite_key(api_key: &str) -> Result<CompositeKey<'_>> {
    let Some((project, credential)) = api_key.split_once('|') else {
        return Err(RelayError::InvalidCredential(format!(
            "vertex key `{}` must be `<project>|<service-account-json>`",
            redact(api_key)
        )));
    };
    let project_id = project.trim();
    if project_id.is_empty() {
        return Err(RelayError::InvalidCredential(
            "vertex key has an empty project id".into(),
        ));
    }
    if credential.trim().is_empty() {
        return Err(RelayError::InvalidCredential(format!(
            "vertex key for project `{project_id}` has an empty service account"
        )));
    }
    Ok(CompositeKey {
        project_id,
        credential,
    })
}

pub struct VertexAdaptor {
    tokens: Arc<AccessTokenCache>,
}

impl VertexAdaptor {
    #[must_use]
    pub fn new(tokens: Arc<AccessTokenCache>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Adaptor for VertexAdaptor {
    fn channel_type(&self) -> ChannelType {
        ChannelType::VertexOpenAI
    }

    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        let key = parse_composite_key(info.api_key())?;
        match info.relay_mode() {
            RelayMode::ChatCompletions => Ok(format!(
                "https://{LOCATION}-aiplatform.googleapis.com/v1beta1/projects/{}/locations/{LOCATION}/endpoints/openapi/chat/completions",
                key.project_id
            )),
            mode => Err(RelayError::InvalidInput(format!(
                "vertex does not support relay mode {mode:?}"
            ))),
        }
    }

    async fn setup_request_header(&self, headers: &mut HeaderMap, info: &RelayInfo) -> Result<()> {
        let key = parse_composite_key(info.api_key())?;
        let token = self.tokens.get_access_token(key.credential).await?;
        headers::set_bearer(headers, &token)
    }

    /// Rewrites `model` to the Vertex model id. The body's `model` is taken
    /// to be the upstream name, not the client-facing one.
    fn convert_request(
        &self,
        _mode: RelayMode,
        request: Option<GeneralRequest>,
    ) -> Result<GeneralRequest> {
        let mut request =
            request.ok_or_else(|| RelayError::InvalidInput("request is missing".into()))?;
        request.model = VERTEX_MODEL_IDS
            .get_redirect_model(&request.model)?
            .to_string();
        Ok(request)
    }
}
