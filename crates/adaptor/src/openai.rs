//! Generic OpenAI-compatible adaptor.
//!
//! Serves OpenAI itself, the OpenAI-compatible vendors (360, Moonshot, 01.AI)
//! and every channel type without a dedicated adaptor.

use crate::{dispatch::Adaptor, headers};
use async_trait::async_trait;
use chanrelay_types::{ChannelType, RelayInfo, traits::Result};
use http::HeaderMap;

pub struct OpenAiAdaptor {
    channel: ChannelType,
}

impl OpenAiAdaptor {
    #[must_use]
    pub fn new(channel: ChannelType) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Adaptor for OpenAiAdaptor {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    async fn setup_request_header(&self, headers: &mut HeaderMap, info: &RelayInfo) -> Result<()> {
        if info.channel_type == ChannelType::OpenAI
            && let Some(org) = info.organization.as_deref().filter(|o| !o.is_empty())
        {
            headers::set_secret(headers, headers::OPENAI_ORGANIZATION, org)?;
        }
        headers::set_bearer(headers, info.api_key())
    }
}
