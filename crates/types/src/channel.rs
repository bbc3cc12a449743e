//! Channel type identifiers.
//!
//! Numeric codes follow the relay's channel table so that values persisted by
//! the surrounding layers map back onto the same provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the upstream provider class behind a configured channel.
///
/// Codes that are not recognised are kept as [`ChannelType::Other`] and are
/// served by the generic OpenAI-compatible adaptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ChannelRepr", into = "ChannelRepr")]
pub enum ChannelType {
    OpenAI,
    Azure,
    Custom,
    AI360,
    Moonshot,
    MiniMax,
    LingYiWanWu,
    Doubao,
    VertexOpenAI,
    Other(u32),
}

impl ChannelType {
    /// Maps a numeric channel code onto a channel type. Never fails.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::OpenAI,
            3 => Self::Azure,
            8 => Self::Custom,
            19 => Self::AI360,
            25 => Self::Moonshot,
            27 => Self::MiniMax,
            31 => Self::LingYiWanWu,
            40 => Self::Doubao,
            42 => Self::VertexOpenAI,
            other => Self::Other(other),
        }
    }

    /// Returns the numeric channel code.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::OpenAI => 1,
            Self::Azure => 3,
            Self::Custom => 8,
            Self::AI360 => 19,
            Self::Moonshot => 25,
            Self::MiniMax => 27,
            Self::LingYiWanWu => 31,
            Self::Doubao => 40,
            Self::VertexOpenAI => 42,
            Self::Other(code) => code,
        }
    }

    /// Default upstream base URL for channels that do not configure one.
    ///
    /// Azure, Custom and Vertex channels have no meaningful default and
    /// return an empty string.
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAI | Self::Other(_) => "https://api.openai.com",
            Self::AI360 => "https://ai.360.cn",
            Self::Moonshot => "https://api.moonshot.cn",
            Self::MiniMax => "https://api.minimax.chat",
            Self::LingYiWanWu => "https://api.lingyiwanwu.com",
            Self::Doubao => "https://ark.cn-beijing.volces.com",
            Self::Azure | Self::Custom | Self::VertexOpenAI => "",
        }
    }

    /// Returns all named channel types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::OpenAI,
            Self::Azure,
            Self::Custom,
            Self::AI360,
            Self::Moonshot,
            Self::MiniMax,
            Self::LingYiWanWu,
            Self::Doubao,
            Self::VertexOpenAI,
        ]
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("openai"),
            Self::Azure => Some("azure"),
            Self::Custom => Some("custom"),
            Self::AI360 => Some("ai360"),
            Self::Moonshot => Some("moonshot"),
            Self::MiniMax => Some("minimax"),
            Self::LingYiWanWu => Some("lingyiwanwu"),
            Self::Doubao => Some("doubao"),
            Self::VertexOpenAI => Some("vertex_openai"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "channel-{}", self.code()),
        }
    }
}

impl From<u32> for ChannelType {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl std::str::FromStr for ChannelType {
    type Err = crate::RelayError;

    /// Parse a channel name, well-known alias, or numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidInput`](crate::RelayError::InvalidInput)
    /// if the string is neither a known name nor a number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u32>() {
            return Ok(Self::from_code(code));
        }
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "azure" | "azure_openai" => Ok(Self::Azure),
            "custom" => Ok(Self::Custom),
            "ai360" | "360" => Ok(Self::AI360),
            "moonshot" | "kimi" => Ok(Self::Moonshot),
            "minimax" => Ok(Self::MiniMax),
            "lingyiwanwu" | "yi" => Ok(Self::LingYiWanWu),
            "doubao" | "volcengine" => Ok(Self::Doubao),
            "vertex_openai" | "vertex" | "vertex-openai" => Ok(Self::VertexOpenAI),
            other => Err(crate::RelayError::InvalidInput(format!(
                "unknown channel type: {other}"
            ))),
        }
    }
}

/// Wire representation: a channel name or a raw numeric code.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChannelRepr {
    Code(u32),
    Name(String),
}

impl TryFrom<ChannelRepr> for ChannelType {
    type Error = crate::RelayError;

    fn try_from(repr: ChannelRepr) -> Result<Self, Self::Error> {
        match repr {
            ChannelRepr::Code(code) => Ok(Self::from_code(code)),
            ChannelRepr::Name(name) => name.parse(),
        }
    }
}

impl From<ChannelType> for ChannelRepr {
    fn from(channel: ChannelType) -> Self {
        match channel.name() {
            Some(name) => Self::Name(name.to_string()),
            None => Self::Code(channel.code()),
        }
    }
}
