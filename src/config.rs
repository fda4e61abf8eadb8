// ABOUTME: Runtime configuration loaded from environment variables.
// ABOUTME: Resolves the configured model against the registry at load time.

use crate::error::ConfigError;
use crate::model::{ModelProfile, ModelRegistry};

/// Model used when OPENAI_MODEL is not set.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Settings for the assistant commands.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub profile: ModelProfile,
    pub registry: ModelRegistry,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_MODEL` and
    /// `AI_MODEL_PROFILES` (path to a JSON registry replacing the built-in
    /// one). Fails if the model has no profile.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("OPENAI_API_KEY"))?;

        let registry = match lookup("AI_MODEL_PROFILES") {
            Some(path) => {
                tracing::debug!(path = %path, "loading model profiles");
                ModelRegistry::from_path(path)?
            }
            None => ModelRegistry::builtin(),
        };

        let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let profile = *registry.resolve(&model)?;

        Ok(Self {
            api_key,
            model,
            profile,
            registry,
        })
    }
}
