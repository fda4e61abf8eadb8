// ABOUTME: RLS policy chat - a streamed conversation about Postgres row level security.
// ABOUTME: Caps the conversation to the model's context window before sending it.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::capper::cap_messages;
use crate::error::CommandError;
use crate::llm::{ChatMessage, LlmClient, Request, StreamEvent};
use crate::model::ModelProfile;
use crate::tokenizer::Tokenizer;

/// Completion tokens reserved for the policy reply.
pub const RLS_MAX_COMPLETION_TOKENS: usize = 1024;

const RLS_SYSTEM_PROMPT: &str = "\
You're a Postgres expert in writing row level security policies. Your purpose is to
generate a policy with the constraints given by the user. You will be provided a schema
on which the policy should be applied.

The output should use the following instructions:
- The generated SQL must be valid SQL.
- Always use double apostrophe in SQL strings (eg. 'Night''s watch')
- You can use only CREATE POLICY or ALTER POLICY queries, no other queries are allowed.
- You can add short explanations to your messages.
- The result should be a valid markdown. The SQL code should be wrapped in ```.
- Always use \"auth.uid()\" instead of \"current_user\".
- You can't use \"USING\" expression on INSERT policies.
- Only use \"WITH CHECK\" expression on INSERT or UPDATE policies.
- The policy name should be short text explaining the policy, enclosed in double quotes.
- Always put explanations as separate text. Never use inline SQL comments.
- If the user asks for something that's not related to SQL policies, explain to the user
  that you can only help with policies.

The output should look like this:
\"CREATE POLICY user_policy ON users FOR INSERT USING (user_name = current_user) WITH (true);\"";

/// Stream of reply events with provider errors mapped to command errors.
pub type CommandStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, CommandError>> + Send + 'static>>;

/// A streamed policy reply and what was trimmed to send it.
pub struct PolicyChat {
    pub stream: CommandStream,
    /// Oldest conversation turns dropped to fit the context window.
    pub evicted: usize,
    /// Prompt tokens plus the reserved completion budget.
    pub token_count: usize,
}

impl std::fmt::Debug for PolicyChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyChat")
            .field("evicted", &self.evicted)
            .field("token_count", &self.token_count)
            .finish_non_exhaustive()
    }
}

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*").expect("valid line break pattern"));

/// Join lines with single spaces, dropping the indentation after each break.
fn one_line(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").trim().to_string()
}

/// Messages that precede every policy conversation and are never evicted.
pub fn rls_preamble(
    entity_definitions: Option<&[String]>,
    policy_definition: Option<&str>,
) -> Vec<ChatMessage> {
    let mut preamble = vec![ChatMessage::system(RLS_SYSTEM_PROMPT)];

    if let Some(definitions) = entity_definitions {
        preamble.push(ChatMessage::user(one_line(&format!(
            "Here is my database schema for reference: {}",
            definitions.join("\n\n")
        ))));
    }

    if let Some(policy) = policy_definition {
        preamble.push(ChatMessage::user(format!(
            "Here is my policy definition for reference:\n{}",
            policy.trim()
        )));
    }

    preamble
}

/// Continue a conversation about building an RLS policy.
///
/// `messages` is the user/assistant history, oldest first. Older turns are
/// dropped until the request fits `profile` with
/// [`RLS_MAX_COMPLETION_TOKENS`] left for the reply.
pub fn chat_rls_policy(
    client: &dyn LlmClient,
    tokenizer: &Tokenizer<'_>,
    profile: &ModelProfile,
    model: &str,
    messages: &[ChatMessage],
    entity_definitions: Option<&[String]>,
    policy_definition: Option<&str>,
) -> PolicyChat {
    let preamble = rls_preamble(entity_definitions, policy_definition);
    let capped = cap_messages(
        tokenizer,
        &preamble,
        messages,
        RLS_MAX_COMPLETION_TOKENS,
        profile,
    );
    let evicted = capped.evicted();
    let token_count = capped.token_count();

    let request = Request::new(model)
        .messages(capped.into_messages())
        .max_tokens(RLS_MAX_COMPLETION_TOKENS as u32)
        .temperature(0.0);

    let stream = client
        .create_message_stream(&request)
        .map(|event| event.map_err(CommandError::from))
        .boxed();

    PolicyChat {
        stream,
        evicted,
        token_count,
    }
}
