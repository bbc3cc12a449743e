//! Channel adaptors and the relay dispatcher.
//!
//! Each provider module implements [`Adaptor`] for one upstream convention.
//! [`get_adaptor`] picks the implementation for a channel type and
//! [`RelayDispatcher`] drives a full relay through it.

pub mod azure;
pub mod custom;
pub mod decode;
pub mod dispatch;
pub mod doubao;
pub mod headers;
pub mod http_util;
pub mod minimax;
pub mod models;
pub mod openai;
pub mod tokenizer;
pub mod url;
pub mod vertex;

pub use azure::AzureAdaptor;
pub use custom::CustomAdaptor;
pub use decode::{DecodeFailure, TOOL_CALL_TOKEN_SURCHARGE};
pub use dispatch::{Adaptor, RelayDispatcher, RelayServices};
pub use doubao::DoubaoAdaptor;
pub use http_util::RquestTransport;
pub use minimax::MiniMaxAdaptor;
pub use models::{ModelIdMap, VERTEX_MODEL_IDS};
pub use openai::OpenAiAdaptor;
pub use tokenizer::TiktokenCounter;
pub use vertex::VertexAdaptor;

use chanrelay_auth::AccessTokenCache;
use chanrelay_types::ChannelType;
use std::sync::Arc;

/// Create a boxed adaptor for the given channel type.
///
/// Never fails: channel types without a dedicated adaptor are served by the
/// generic OpenAI-compatible one.
#[must_use]
pub fn get_adaptor(channel: ChannelType, tokens: Arc<AccessTokenCache>) -> Box<dyn Adaptor> {
    match channel {
        ChannelType::Azure => Box::new(AzureAdaptor),
        ChannelType::Custom => Box::new(CustomAdaptor),
        ChannelType::MiniMax => Box::new(MiniMaxAdaptor),
        ChannelType::Doubao => Box::new(DoubaoAdaptor),
        ChannelType::VertexOpenAI => Box::new(VertexAdaptor::new(tokens)),
        ChannelType::OpenAI
        | ChannelType::AI360
        | ChannelType::Moonshot
        | ChannelType::LingYiWanWu
        | ChannelType::Other(_) => Box::new(OpenAiAdaptor::new(channel)),
    }
}
