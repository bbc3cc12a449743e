//! Relay mode derived from the inbound request path.

use serde::{Deserialize, Serialize};

/// The kind of OpenAI-style operation being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    #[default]
    Unknown,
    ChatCompletions,
    Completions,
    Embeddings,
    Moderations,
    ImagesGenerations,
    Edits,
    AudioSpeech,
    AudioTranscription,
    AudioTranslation,
}

impl RelayMode {
    /// Classifies a request path such as `/v1/chat/completions?x=1`.
    ///
    /// Only the path prefix matters; unknown paths yield [`RelayMode::Unknown`].
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        if path.starts_with("/v1/chat/completions") {
            Self::ChatCompletions
        } else if path.starts_with("/v1/completions") {
            Self::Completions
        } else if path.starts_with("/v1/embeddings") || path.ends_with("embeddings") {
            Self::Embeddings
        } else if path.starts_with("/v1/moderations") {
            Self::Moderations
        } else if path.starts_with("/v1/images/generations") {
            Self::ImagesGenerations
        } else if path.starts_with("/v1/edits") {
            Self::Edits
        } else if path.starts_with("/v1/audio/speech") {
            Self::AudioSpeech
        } else if path.starts_with("/v1/audio/transcriptions") {
            Self::AudioTranscription
        } else if path.starts_with("/v1/audio/translations") {
            Self::AudioTranslation
        } else {
            Self::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            RelayMode::from_path("/v1/chat/completions"),
            RelayMode::ChatCompletions
        );
        assert_eq!(
            RelayMode::from_path("/v1/chat/completions?api-version=1"),
            RelayMode::ChatCompletions
        );
        assert_eq!(RelayMode::from_path("/v1/completions"), RelayMode::Completions);
        assert_eq!(RelayMode::from_path("/v1/embeddings"), RelayMode::Embeddings);
        assert_eq!(
            RelayMode::from_path("/v1/engines/text-embedding-ada-002/embeddings"),
            RelayMode::Embeddings
        );
        assert_eq!(
            RelayMode::from_path("/v1/audio/transcriptions"),
            RelayMode::AudioTranscription
        );
        assert_eq!(RelayMode::from_path("/v1/unknown"), RelayMode::Unknown);
        assert_eq!(RelayMode::from_path(""), RelayMode::Unknown);
    }
}
