// ABOUTME: cap_messages - oldest-first eviction of conversation turns.
// ABOUTME: Returns the preamble plus the newest turns that fit the token budget.

use crate::llm::ChatMessage;
use crate::model::ModelProfile;
use crate::tokenizer::Tokenizer;

/// A request trimmed to fit a model's context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CappedRequest {
    messages: Vec<ChatMessage>,
    preamble_len: usize,
    evicted: usize,
    token_count: usize,
    max_context_tokens: usize,
}

impl CappedRequest {
    /// Preamble followed by the surviving conversation, ready to send.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The surviving conversation turns, a suffix of the original conversation.
    pub fn conversation(&self) -> &[ChatMessage] {
        &self.messages[self.preamble_len..]
    }

    /// Number of conversation turns removed from the front.
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Request tokens plus the reserved completion budget.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Whether the request is under the context window.
    ///
    /// Only false when the preamble and reserve alone meet the budget.
    pub fn fits(&self) -> bool {
        self.token_count < self.max_context_tokens
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

/// Fit `preamble ++ conversation` into the profile's context window.
///
/// Removes conversation turns oldest-first until request tokens plus
/// `reserved_completion_tokens` drop below `max_context_tokens`, or the
/// conversation is empty. The preamble is never evicted, so a preamble that
/// is already over budget comes back unchanged and over budget; that is not
/// treated as an error.
pub fn cap_messages(
    tokenizer: &Tokenizer<'_>,
    preamble: &[ChatMessage],
    conversation: &[ChatMessage],
    reserved_completion_tokens: usize,
    profile: &ModelProfile,
) -> CappedRequest {
    // Message counts are additive, so each turn is encoded once and its cost
    // subtracted on eviction instead of recounting the whole request.
    let costs: Vec<usize> = conversation
        .iter()
        .map(|message| tokenizer.count_message_tokens(message, profile))
        .collect();

    let mut total = tokenizer.count_request_tokens(preamble, profile)
        + costs.iter().sum::<usize>()
        + reserved_completion_tokens;

    let mut start = 0;
    while total >= profile.max_context_tokens && start < conversation.len() {
        total -= costs[start];
        start += 1;
    }

    if start > 0 {
        tracing::debug!(
            evicted = start,
            kept = conversation.len() - start,
            tokens = total,
            max_context_tokens = profile.max_context_tokens,
            "evicted oldest conversation turns"
        );
    }
    if total >= profile.max_context_tokens {
        tracing::warn!(
            tokens = total,
            max_context_tokens = profile.max_context_tokens,
            "preamble alone exceeds the context window"
        );
    }

    let mut messages = Vec::with_capacity(preamble.len() + conversation.len() - start);
    messages.extend_from_slice(preamble);
    messages.extend_from_slice(&conversation[start..]);

    CappedRequest {
        messages,
        preamble_len: preamble.len(),
        evicted: start,
        token_count: total,
        max_context_tokens: profile.max_context_tokens,
    }
}
