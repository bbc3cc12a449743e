//! Strongly-typed OpenAI-compatible request body.
//!
//! Only the fields the adaptor layer inspects are typed; everything else is
//! carried through untouched in a catch-all map so passthrough providers see
//! exactly what the client sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A generic OpenAI-compatible request body (chat, completions, embeddings…).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralRequest {
    /// The model identifier (e.g., `"gpt-4o"`).
    pub model: String,
    /// Whether to use streaming SSE mode.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// The conversation messages; absent for non-chat operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
    /// All remaining fields not captured above.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl GeneralRequest {
    /// Reconstructs the full request body as a `serde_json::Value`.
    #[must_use]
    pub fn into_body(self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.extra.len() + 3);
        for (k, v) in self.extra {
            map.insert(k, v);
        }
        map.insert("model".into(), Value::String(self.model));
        if self.stream {
            map.insert("stream".into(), Value::Bool(true));
        }
        if let Some(messages) = self.messages {
            map.insert("messages".into(), Value::Array(messages));
        }
        Value::Object(map)
    }

    /// Returns a `serde_json::Value` view of the full body without consuming self.
    #[must_use]
    pub fn to_body(&self) -> Value {
        self.clone().into_body()
    }
}
