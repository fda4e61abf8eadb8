// ABOUTME: Defines all error types for the ai-commands library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under AiError.

/// Top-level error type for the ai-commands library.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Errors from loading configuration and resolving model profiles.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from initializing a byte-pair encoding table.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Failed to load {encoding} encoding: {source}")]
    Load {
        encoding: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors from LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Stream closed unexpectedly")]
    StreamClosed,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Provider error code reported when a request does not fit the model's context window.
pub const CONTEXT_LENGTH_EXCEEDED: &str = "context_length_exceeded";

impl LlmError {
    /// Returns true if the provider rejected the request for exceeding the context window.
    pub fn is_context_length_exceeded(&self) -> bool {
        matches!(
            self,
            LlmError::Api { code: Some(code), .. } if code == CONTEXT_LENGTH_EXCEEDED
        )
    }
}

/// Errors from the SQL and RLS assistant commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Your request exceeds the model's context window")]
    ContextLength,

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("The model returned no SQL")]
    EmptySql,

    #[error("Malformed function arguments: {0}")]
    MalformedArguments(#[source] serde_json::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("LLM error: {0}")]
    Llm(LlmError),
}

impl From<LlmError> for CommandError {
    fn from(err: LlmError) -> Self {
        if err.is_context_length_exceeded() {
            CommandError::ContextLength
        } else {
            CommandError::Llm(err)
        }
    }
}
