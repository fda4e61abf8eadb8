// ABOUTME: Tokenizer - counts chat tokens the way the completion API bills them.
// ABOUTME: Adds per-message, per-name, and per-request framing overheads.

use super::{BpeEncoder, Encoder};
use crate::error::TokenizerError;
use crate::llm::ChatMessage;
use crate::model::ModelProfile;

/// Tokens that prime every reply (`<|start|>assistant<|message|>`).
pub const TOKENS_PER_REQUEST: usize = 3;

/// Counts tokens for messages against a model profile.
#[derive(Clone, Copy)]
pub struct Tokenizer<'e> {
    encoder: &'e dyn Encoder,
}

impl<'e> Tokenizer<'e> {
    /// Create a tokenizer over the given encoder.
    pub fn new(encoder: &'e dyn Encoder) -> Self {
        Self { encoder }
    }

    /// Tokens billed for a single message.
    ///
    /// Encodes the content and, if present, the name; the role is not
    /// encoded. A negative `tokens_per_name` can lower the total but never
    /// below zero.
    pub fn count_message_tokens(&self, message: &ChatMessage, profile: &ModelProfile) -> usize {
        let mut tokens = self.encoder.count(message.content()) + profile.tokens_per_message;

        if let Some(name) = message.name() {
            tokens += self.encoder.count(name);
            tokens = tokens.saturating_add_signed(profile.tokens_per_name as isize);
        }

        tokens
    }

    /// Tokens billed for a whole request, including the reply priming.
    pub fn count_request_tokens(&self, messages: &[ChatMessage], profile: &ModelProfile) -> usize {
        messages
            .iter()
            .map(|message| self.count_message_tokens(message, profile))
            .sum::<usize>()
            + TOKENS_PER_REQUEST
    }
}

impl Tokenizer<'static> {
    /// Tokenizer over the shared BPE table the profile's model uses.
    pub fn for_profile(profile: &ModelProfile) -> Result<Self, TokenizerError> {
        let encoder = BpeEncoder::shared(profile.encoding)?;
        Ok(Self::new(encoder))
    }
}

impl std::fmt::Debug for Tokenizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}
