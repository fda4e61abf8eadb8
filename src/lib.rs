// ABOUTME: Root module for ai-commands - token-budgeted chat requests for SQL assistants.
// ABOUTME: Re-exports all public types from submodules.

pub mod capper;
pub mod command;
pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod prelude;
pub mod tokenizer;

pub use error::AiError;
