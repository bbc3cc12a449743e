//! BPE-based completion token estimation.

use chanrelay_types::{RelayError, TokenCounter, traits::Result};
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

/// [`TokenCounter`] backed by the OpenAI tokenizers.
///
/// Models of the `gpt-4o` generation and later use `o200k_base`; everything
/// else, including non-OpenAI models, is estimated with `cl100k_base`.
pub struct TiktokenCounter {
    cl100k: CoreBPE,
    o200k: CoreBPE,
}

impl TiktokenCounter {
    /// Load both encodings.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if an encoding fails to initialise.
    pub fn new() -> Result<Self> {
        let cl100k = cl100k_base().map_err(|e| RelayError::Config(format!("cl100k_base: {e}")))?;
        let o200k = o200k_base().map_err(|e| RelayError::Config(format!("o200k_base: {e}")))?;
        Ok(Self { cl100k, o200k })
    }

    fn bpe_for(&self, model: &str) -> &CoreBPE {
        if is_o200k_model(model) {
            &self.o200k
        } else {
            &self.cl100k
        }
    }
}

fn is_o200k_model(model: &str) -> bool {
    ["gpt-5", "gpt-4.1", "gpt-4o", "o1", "o3", "o4"]
        .iter()
        .any(|p| model.starts_with(p))
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str, model: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        let n = self.bpe_for(model).encode_ordinary(text).len();
        u64::try_from(n).unwrap_or(u64::MAX)
    }
}
