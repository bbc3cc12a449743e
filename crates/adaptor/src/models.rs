//! Model registry: static model lists, channel names and model-id maps.

use chanrelay_types::{ChannelType, RelayError, traits::Result};

/// Read-only mapping from client-facing model names to provider model ids.
#[derive(Debug, Clone, Copy)]
pub struct ModelIdMap(&'static [(&'static str, &'static str)]);

impl ModelIdMap {
    /// Resolve `name` to the provider's model id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ModelNotFound`] if `name` is not mapped.
    pub fn get_redirect_model(&self, name: &str) -> Result<&'static str> {
        self.0
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| RelayError::ModelNotFound(name.to_string()))
    }

    /// All mapped names, sorted.
    #[must_use]
    pub fn model_list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.iter().map(|(k, _)| (*k).to_string()).collect();
        names.sort();
        names
    }
}

/// Model ids served by the Vertex AI OpenAI-compatible endpoint.
pub const VERTEX_MODEL_IDS: ModelIdMap = ModelIdMap(&[
    ("gemini-1.5-pro", "google/gemini-1.5-pro-002"),
    ("gemini-1.5-flash", "google/gemini-1.5-flash-002"),
    ("gemini-2.0-flash", "google/gemini-2.0-flash-001"),
    ("gemini-2.0-flash-lite", "google/gemini-2.0-flash-lite-001"),
    ("gemini-2.5-pro", "google/gemini-2.5-pro"),
    ("gemini-2.5-flash", "google/gemini-2.5-flash"),
    ("llama-3.1-405b-instruct", "meta/llama-3.1-405b-instruct-maas"),
    ("llama-3.1-70b-instruct", "meta/llama-3.1-70b-instruct-maas"),
    ("llama-3.1-8b-instruct", "meta/llama-3.1-8b-instruct-maas"),
]);

fn to_strings(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| (*m).to_string()).collect()
}

/// Returns the generic OpenAI model list.
#[must_use]
pub fn openai_models() -> Vec<String> {
    to_strings(&[
        "gpt-3.5-turbo",
        "gpt-3.5-turbo-0125",
        "gpt-3.5-turbo-16k",
        "gpt-3.5-turbo-instruct",
        "gpt-4",
        "gpt-4-turbo",
        "gpt-4-turbo-2024-04-09",
        "gpt-4o",
        "gpt-4o-2024-08-06",
        "gpt-4o-mini",
        "gpt-4.1",
        "gpt-4.1-mini",
        "o1",
        "o1-mini",
        "o3-mini",
        "text-embedding-ada-002",
        "text-embedding-3-small",
        "text-embedding-3-large",
        "text-moderation-latest",
        "dall-e-3",
        "whisper-1",
        "tts-1",
        "tts-1-hd",
    ])
}

/// Returns the 360 AI Brain model list.
#[must_use]
pub fn ai360_models() -> Vec<String> {
    to_strings(&[
        "360GPT_S2_V9",
        "embedding-bert-512-v1",
        "embedding_s1_v1",
        "semantic_similarity_s1_v1",
    ])
}

/// Returns the Moonshot (Kimi) model list.
#[must_use]
pub fn moonshot_models() -> Vec<String> {
    to_strings(&["moonshot-v1-8k", "moonshot-v1-32k", "moonshot-v1-128k"])
}

/// Returns the 01.AI (Yi) model list.
#[must_use]
pub fn lingyiwanwu_models() -> Vec<String> {
    to_strings(&["yi-34b-chat-0205", "yi-34b-chat-200k", "yi-vl-plus"])
}

/// Returns the MiniMax model list.
#[must_use]
pub fn minimax_models() -> Vec<String> {
    to_strings(&[
        "abab6.5-chat",
        "abab6.5s-chat",
        "abab6-chat",
        "abab5.5-chat",
        "abab5.5s-chat",
    ])
}

/// Returns the Doubao (Volcengine Ark) model list.
#[must_use]
pub fn doubao_models() -> Vec<String> {
    to_strings(&[
        "Doubao-pro-128k",
        "Doubao-pro-32k",
        "Doubao-pro-4k",
        "Doubao-lite-128k",
        "Doubao-lite-32k",
        "Doubao-lite-4k",
        "Doubao-embedding",
    ])
}

/// Model list advertised for a channel type; generic OpenAI list otherwise.
#[must_use]
pub fn model_list(channel: ChannelType) -> Vec<String> {
    match channel {
        ChannelType::AI360 => ai360_models(),
        ChannelType::Moonshot => moonshot_models(),
        ChannelType::LingYiWanWu => lingyiwanwu_models(),
        ChannelType::MiniMax => minimax_models(),
        ChannelType::Doubao => doubao_models(),
        ChannelType::VertexOpenAI => VERTEX_MODEL_IDS.model_list(),
        ChannelType::OpenAI | ChannelType::Azure | ChannelType::Custom | ChannelType::Other(_) => {
            openai_models()
        }
    }
}

/// Display name reported for a channel type; `openai` otherwise.
#[must_use]
pub fn channel_name(channel: ChannelType) -> &'static str {
    match channel {
        ChannelType::AI360 => "ai360",
        ChannelType::Moonshot => "moonshot",
        ChannelType::LingYiWanWu => "lingyiwanwu",
        ChannelType::MiniMax => "minimax",
        ChannelType::Doubao => "doubao",
        ChannelType::VertexOpenAI => "vertex-ai",
        ChannelType::OpenAI | ChannelType::Azure | ChannelType::Custom | ChannelType::Other(_) => {
            "openai"
        }
    }
}
