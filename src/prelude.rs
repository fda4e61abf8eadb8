// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use ai_commands::prelude::*;` to get started quickly.

pub use crate::capper::{CappedRequest, cap_messages};
pub use crate::command::{
    DebugSqlResult, EditSqlResult, GenerateSqlResult, GenerateTitleResult, PolicyChat,
    chat_rls_policy, debug_sql, edit_sql, extract_markdown_sql, generate_sql, title_sql,
};
pub use crate::config::Config;
pub use crate::error::{AiError, CommandError, ConfigError, LlmError, TokenizerError};
pub use crate::llm::{
    ChatMessage, LlmClient, OpenAIClient, Request, Response, Role, StopReason, StreamEvent,
    collect_text, collect_text_with,
};
pub use crate::model::{Encoding, ModelProfile, ModelRegistry};
pub use crate::tokenizer::{BpeEncoder, Encoder, TOKENS_PER_REQUEST, Tokenizer};
