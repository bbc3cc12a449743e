//! Core types and traits for the chanrelay workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! adaptor dispatch layer: the error taxonomy, channel identifiers, the
//! per-request [`RelayInfo`], token accounting, and the collaborator traits
//! (transport, token counting, token fetching) that surrounding layers supply.

pub mod channel;
pub mod error;
pub mod mode;
pub mod relay_info;
pub mod request;
pub mod token;
pub mod traits;
pub mod usage;

pub use channel::ChannelType;
pub use error::RelayError;
pub use mode::RelayMode;
pub use relay_info::RelayInfo;
pub use request::GeneralRequest;
pub use token::AccessToken;
pub use traits::{
    ByteStream, TokenCounter, TokenFetcher, Transport, UpstreamRequest, UpstreamResponse,
};
pub use usage::Usage;
