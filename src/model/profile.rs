// ABOUTME: ModelProfile - context window size and per-message token overheads.
// ABOUTME: Also names the byte-pair encoding table the model's tokenizer uses.

use serde::{Deserialize, Serialize};

/// Byte-pair encoding table used by a model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// GPT-3.5 / GPT-4 family.
    #[default]
    #[serde(rename = "cl100k_base")]
    Cl100kBase,
    /// GPT-4o family.
    #[serde(rename = "o200k_base")]
    O200kBase,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::O200kBase => "o200k_base",
        }
    }
}

/// Token budget and framing overheads for one model.
///
/// The overheads are measured against a specific hosted model version and
/// drift as providers change their chat framing, which is why they are data
/// rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Hard ceiling on prompt plus completion tokens.
    pub max_context_tokens: usize,
    /// Overhead charged for every message envelope.
    pub tokens_per_message: usize,
    /// Overhead charged when a message carries a name. Negative for models
    /// that drop the role when a name is present.
    pub tokens_per_name: i32,
    #[serde(default)]
    pub encoding: Encoding,
}

impl ModelProfile {
    pub const fn new(max_context_tokens: usize, tokens_per_message: usize, tokens_per_name: i32) -> Self {
        Self {
            max_context_tokens,
            tokens_per_message,
            tokens_per_name,
            encoding: Encoding::Cl100kBase,
        }
    }

    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}
