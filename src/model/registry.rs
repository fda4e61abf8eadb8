// ABOUTME: ModelRegistry - validated table of model profiles and aliases.
// ABOUTME: Loads the built-in table or a versioned JSON file and resolves model ids.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Encoding, ModelProfile};
use crate::error::ConfigError;

/// Format version of the registry file this crate understands.
pub const REGISTRY_VERSION: u32 = 1;

/// Registry of model profiles, keyed by model identifier.
///
/// Every registry is validated when it is built, so a lookup failure can only
/// mean the caller asked for a model nobody configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    version: u32,
    models: BTreeMap<String, ModelProfile>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl ModelRegistry {
    /// The built-in profile table.
    pub fn builtin() -> Self {
        let models = [
            ("gpt-3.5-turbo-0301", ModelProfile::new(4097, 4, -1)),
            ("gpt-3.5-turbo-0613", ModelProfile::new(4097, 3, 1)),
            ("gpt-3.5-turbo-1106", ModelProfile::new(16385, 3, 1)),
            ("gpt-4-0314", ModelProfile::new(8192, 3, 1)),
            ("gpt-4-0613", ModelProfile::new(8192, 3, 1)),
            (
                "gpt-4o",
                ModelProfile::new(128_000, 3, 1).with_encoding(Encoding::O200kBase),
            ),
        ];
        let aliases = [
            ("gpt-3.5-turbo", "gpt-3.5-turbo-0301"),
            ("gpt-4", "gpt-4-0314"),
        ];

        Self {
            version: REGISTRY_VERSION,
            models: models
                .into_iter()
                .map(|(id, profile)| (id.to_string(), profile))
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|(alias, id)| (alias.to_string(), id.to_string()))
                .collect(),
        }
    }

    /// Build a registry from explicit profiles and aliases.
    pub fn new(
        models: impl IntoIterator<Item = (String, ModelProfile)>,
        aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let registry = Self {
            version: REGISTRY_VERSION,
            models: models.into_iter().collect(),
            aliases: aliases.into_iter().collect(),
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Parse and validate a registry from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let registry: Self = serde_json::from_str(json)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Read, parse and validate a registry file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Check the registry for inconsistencies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != REGISTRY_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported model registry version {} (expected {})",
                self.version, REGISTRY_VERSION
            )));
        }

        if self.models.is_empty() {
            return Err(ConfigError::Invalid(
                "model registry defines no models".to_string(),
            ));
        }

        for (id, profile) in &self.models {
            if profile.max_context_tokens == 0 {
                return Err(ConfigError::Invalid(format!(
                    "model '{}' has a zero context window",
                    id
                )));
            }
        }

        for (alias, target) in &self.aliases {
            if self.models.contains_key(alias) {
                return Err(ConfigError::Invalid(format!(
                    "alias '{}' shadows a model of the same name",
                    alias
                )));
            }
            if !self.models.contains_key(target) {
                return Err(ConfigError::Invalid(format!(
                    "alias '{}' points at unknown model '{}'",
                    alias, target
                )));
            }
        }

        Ok(())
    }

    /// Look up the profile for a model id or alias.
    pub fn resolve(&self, model: &str) -> Result<&ModelProfile, ConfigError> {
        let id = self.aliases.get(model).map(String::as_str).unwrap_or(model);
        self.models
            .get(id)
            .ok_or_else(|| ConfigError::UnknownModel(model.to_string()))
    }

    /// Check whether a model id or alias is known.
    pub fn contains(&self, model: &str) -> bool {
        self.resolve(model).is_ok()
    }

    /// Concrete model ids with their profiles, sorted by id.
    pub fn models(&self) -> impl Iterator<Item = (&str, &ModelProfile)> {
        self.models.iter().map(|(id, profile)| (id.as_str(), profile))
    }

    /// Aliases and the ids they stand for, sorted by alias.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, id)| (alias.as_str(), id.as_str()))
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
