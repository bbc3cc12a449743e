//! Doubao (Volcengine Ark) adaptor.

use crate::dispatch::Adaptor;
use chanrelay_types::{ChannelType, RelayError, RelayInfo, RelayMode, traits::Result};

/// Models prefixed with this are Ark bot endpoints.
const BOT_PREFIX: &str = "bot-";

pub struct DoubaoAdaptor;

impl Adaptor for DoubaoAdaptor {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Doubao
    }

    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        let base = &info.base_url;
        match info.relay_mode() {
            RelayMode::ChatCompletions if info.upstream_model_name.starts_with(BOT_PREFIX) => {
                Ok(format!("{base}/api/v3/bots/chat/completions"))
            }
            RelayMode::ChatCompletions => Ok(format!("{base}/api/v3/chat/completions")),
            RelayMode::Embeddings => Ok(format!("{base}/api/v3/embeddings")),
            mode => Err(RelayError::InvalidInput(format!(
                "doubao does not support relay mode {mode:?}"
            ))),
        }
    }
}
