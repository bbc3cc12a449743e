//! Configuration loading for chanrelay.
//!
//! Uses figment for YAML-based configuration merged over serialized defaults,
//! with `CHANRELAY_`-prefixed environment overrides.

pub mod schema;

pub use schema::{ChannelConfig, Config, LogConfig, TokenCacheConfig};
