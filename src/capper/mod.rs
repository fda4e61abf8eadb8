// ABOUTME: Capper module - fits a chat request into a model's context window.
// ABOUTME: Evicts the oldest conversation turns while keeping the preamble intact.

mod capper;

pub use capper::*;
