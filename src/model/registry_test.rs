// ABOUTME: Tests for the model registry - lookups, aliases, and validation.
// ABOUTME: Covers the built-in table and JSON files read from disk.

use std::io::Write;

use super::*;
use crate::error::ConfigError;

#[test]
fn test_builtin_is_valid() {
    assert!(ModelRegistry::builtin().validate().is_ok());
}

#[test]
fn test_resolve_concrete_model() {
    let registry = ModelRegistry::builtin();
    let profile = registry.resolve("gpt-3.5-turbo-0301").unwrap();
    assert_eq!(profile.max_context_tokens, 4097);
    assert_eq!(profile.tokens_per_message, 4);
    assert_eq!(profile.tokens_per_name, -1);
    assert_eq!(profile.encoding, Encoding::Cl100kBase);
}

#[test]
fn test_resolve_alias() {
    let registry = ModelRegistry::builtin();
    assert_eq!(
        registry.resolve("gpt-4").unwrap(),
        registry.resolve("gpt-4-0314").unwrap()
    );
    assert_eq!(
        registry.resolve("gpt-3.5-turbo").unwrap(),
        registry.resolve("gpt-3.5-turbo-0301").unwrap()
    );
}

#[test]
fn test_resolve_unknown_model() {
    let registry = ModelRegistry::builtin();
    match registry.resolve("text-davinci-003") {
        Err(ConfigError::UnknownModel(model)) => assert_eq!(model, "text-davinci-003"),
        other => panic!("Expected UnknownModel, got {:?}", other),
    }
    assert!(!registry.contains("text-davinci-003"));
    assert!(registry.contains("gpt-4o"));
}

#[test]
fn test_gpt4o_uses_o200k() {
    let registry = ModelRegistry::builtin();
    assert_eq!(
        registry.resolve("gpt-4o").unwrap().encoding,
        Encoding::O200kBase
    );
}

#[test]
fn test_from_json() {
    let json = r#"{
        "version": 1,
        "models": {
            "small": {"max_context_tokens": 100, "tokens_per_message": 3, "tokens_per_name": 1}
        },
        "aliases": {"tiny": "small"}
    }"#;
    let registry = ModelRegistry::from_json(json).unwrap();
    let profile = registry.resolve("tiny").unwrap();
    assert_eq!(*profile, ModelProfile::new(100, 3, 1));
    assert_eq!(registry.models().count(), 1);
    assert_eq!(registry.aliases().collect::<Vec<_>>(), vec![("tiny", "small")]);
}

#[test]
fn test_from_json_rejects_wrong_version() {
    let json = r#"{"version": 2, "models": {"m": {"max_context_tokens": 10, "tokens_per_message": 3, "tokens_per_name": 1}}}"#;
    assert!(matches!(
        ModelRegistry::from_json(json),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_from_json_rejects_dangling_alias() {
    let json = r#"{
        "version": 1,
        "models": {"m": {"max_context_tokens": 10, "tokens_per_message": 3, "tokens_per_name": 1}},
        "aliases": {"a": "missing"}
    }"#;
    assert!(matches!(
        ModelRegistry::from_json(json),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_from_json_rejects_alias_to_alias() {
    let json = r#"{
        "version": 1,
        "models": {"m": {"max_context_tokens": 10, "tokens_per_message": 3, "tokens_per_name": 1}},
        "aliases": {"a": "m", "b": "a"}
    }"#;
    assert!(ModelRegistry::from_json(json).is_err());
}

#[test]
fn test_from_json_rejects_zero_context() {
    let json = r#"{"version": 1, "models": {"m": {"max_context_tokens": 0, "tokens_per_message": 3, "tokens_per_name": 1}}}"#;
    assert!(ModelRegistry::from_json(json).is_err());
}

#[test]
fn test_from_json_rejects_empty_table() {
    let json = r#"{"version": 1, "models": {}}"#;
    assert!(ModelRegistry::from_json(json).is_err());
}

#[test]
fn test_from_json_malformed() {
    assert!(matches!(
        ModelRegistry::from_json("{not json"),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_new_rejects_shadowing_alias() {
    let result = ModelRegistry::new(
        [("m".to_string(), ModelProfile::new(10, 3, 1))],
        [("m".to_string(), "m".to_string())],
    );
    assert!(result.is_err());
}

#[test]
fn test_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::to_string(&ModelRegistry::builtin()).unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let registry = ModelRegistry::from_path(file.path()).unwrap();
    assert_eq!(registry, ModelRegistry::builtin());
}

#[test]
fn test_from_path_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = ModelRegistry::from_path(dir.path().join("models.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
