//! MiniMax adaptor (chat completions v2).

use crate::dispatch::Adaptor;
use chanrelay_types::{ChannelType, RelayError, RelayInfo, RelayMode, traits::Result};

pub struct MiniMaxAdaptor;

impl Adaptor for MiniMaxAdaptor {
    fn channel_type(&self) -> ChannelType {
        ChannelType::MiniMax
    }

    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        match info.relay_mode() {
            RelayMode::ChatCompletions => {
                Ok(format!("{}/v1/text/chatcompletion_v2", info.base_url))
            }
            mode => Err(RelayError::InvalidInput(format!(
                "minimax does not support relay mode {mode:?}"
            ))),
        }
    }
}
