//! Adaptor strategy trait and the per-relay dispatcher.
//!
//! Each provider module implements [`Adaptor`]; the [`RelayDispatcher`] binds
//! one adaptor to a relay and drives convert → URL → headers → transport →
//! decode against the injected collaborators.

use crate::{
    decode::{self, DecodeFailure, Forward},
    get_adaptor, headers, models, url,
};
use async_trait::async_trait;
use bon::Builder;
use bytes::Bytes;
use chanrelay_auth::AccessTokenCache;
use chanrelay_types::{
    ChannelType, GeneralRequest, RelayError, RelayInfo, RelayMode, TokenCounter, Transport,
    UpstreamRequest, UpstreamResponse, Usage, traits::Result,
};
use http::{HeaderMap, Method};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-provider behavior. Defaults implement the generic OpenAI-compatible
/// provider; implementors override only what differs.
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// The channel type this adaptor was created for.
    fn channel_type(&self) -> ChannelType;

    /// Full upstream URL for the relay.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidInput`] for unsupported relay modes and
    /// [`RelayError::InvalidCredential`] for malformed composite keys.
    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        Ok(url::full_request_url(
            &info.base_url,
            &info.request_url_path,
            info.channel_type,
        ))
    }

    /// Add authentication headers on top of the baseline set.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is unusable or a token cannot be
    /// obtained.
    async fn setup_request_header(&self, headers: &mut HeaderMap, info: &RelayInfo) -> Result<()> {
        headers::set_bearer(headers, info.api_key())
    }

    /// Outbound body for `request`; passthrough by default.
    ///
    /// `request.model` must already hold the upstream model name
    /// (`RelayInfo::upstream_model_name`); adaptors that remap models read it
    /// from the body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidInput`] if the request is absent.
    fn convert_request(
        &self,
        _mode: RelayMode,
        request: Option<GeneralRequest>,
    ) -> Result<GeneralRequest> {
        request.ok_or_else(|| RelayError::InvalidInput("request is missing".into()))
    }

    fn get_model_list(&self) -> Vec<String> {
        models::model_list(self.channel_type())
    }

    fn get_channel_name(&self) -> &'static str {
        models::channel_name(self.channel_type())
    }
}

/// Collaborators shared by every relay.
#[derive(Clone, Builder)]
pub struct RelayServices {
    transport: Arc<dyn Transport>,
    counter: Arc<dyn TokenCounter>,
    #[builder(default = AccessTokenCache::global())]
    tokens: Arc<AccessTokenCache>,
}

/// One adaptor bound to the channel of a relay, plus its collaborators.
pub struct RelayDispatcher {
    adaptor: Box<dyn Adaptor>,
    services: RelayServices,
}

impl RelayDispatcher {
    /// Select the adaptor for `info.channel_type`. Never fails; unknown
    /// channel types get the generic OpenAI-compatible adaptor.
    #[must_use]
    pub fn init(info: &RelayInfo, services: RelayServices) -> Self {
        let adaptor = get_adaptor(info.channel_type, Arc::clone(&services.tokens));
        tracing::debug!(
            channel = %info.channel_type,
            adaptor = adaptor.get_channel_name(),
            "adaptor selected"
        );
        Self { adaptor, services }
    }

    #[must_use]
    pub fn channel_type(&self) -> ChannelType {
        self.adaptor.channel_type()
    }

    /// # Errors
    ///
    /// See [`Adaptor::get_request_url`].
    pub fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        self.adaptor.get_request_url(info)
    }

    /// Baseline headers plus the adaptor's authentication scheme.
    ///
    /// # Errors
    ///
    /// See [`Adaptor::setup_request_header`].
    pub async fn setup_request_header(&self, info: &RelayInfo) -> Result<HeaderMap> {
        let mut headers = headers::baseline(info)?;
        self.adaptor.setup_request_header(&mut headers, info).await?;
        Ok(headers)
    }

    /// # Errors
    ///
    /// See [`Adaptor::convert_request`].
    pub fn convert_request(
        &self,
        mode: RelayMode,
        request: Option<GeneralRequest>,
    ) -> Result<GeneralRequest> {
        self.adaptor.convert_request(mode, request)
    }

    /// Resolve URL and headers, then send `body` through the transport.
    ///
    /// Resolution errors are returned before the transport is called.
    ///
    /// # Errors
    ///
    /// Resolution errors, [`RelayError::Transport`], or
    /// [`RelayError::Cancelled`].
    pub async fn do_request(
        &self,
        info: &RelayInfo,
        body: &GeneralRequest,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse> {
        let url = self.get_request_url(info)?;
        let headers = self.setup_request_header(info).await?;
        let body = Bytes::from(serde_json::to_vec(body)?);
        tracing::debug!(
            channel = %info.channel_type,
            model = %info.upstream_model_name,
            %url,
            stream = info.is_stream,
            "sending upstream request"
        );
        let request = UpstreamRequest {
            method: Method::POST,
            url,
            headers,
            body,
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RelayError::Cancelled),
            resp = self.services.transport.send(request) => resp,
        }
    }

    /// Decode the upstream response into usage, forwarding events to
    /// `forward` when given.
    ///
    /// # Errors
    ///
    /// See [`decode::decode_response`].
    pub async fn do_response(
        &self,
        info: &RelayInfo,
        resp: UpstreamResponse,
        forward: Forward<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Usage, DecodeFailure> {
        decode::decode_response(info, resp, self.services.counter.as_ref(), forward, cancel).await
    }

    /// Run one relay end to end.
    ///
    /// # Errors
    ///
    /// Any error from the individual stages; stream failures carry partial
    /// usage.
    pub async fn relay(
        &self,
        info: &RelayInfo,
        request: Option<GeneralRequest>,
        forward: Forward<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Usage, DecodeFailure> {
        let body = self.convert_request(info.relay_mode(), request)?;
        let resp = self.do_request(info, &body, cancel).await?;
        let usage = self.do_response(info, resp, forward, cancel).await?;
        tracing::debug!(
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            "relay finished"
        );
        Ok(usage)
    }

    #[must_use]
    pub fn get_model_list(&self) -> Vec<String> {
        self.adaptor.get_model_list()
    }

    #[must_use]
    pub fn get_channel_name(&self) -> &'static str {
        self.adaptor.get_channel_name()
    }
}
