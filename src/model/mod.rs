// ABOUTME: Model module - per-model token budgets and overhead constants.
// ABOUTME: Profiles live in a validated registry keyed by model identifier.

mod profile;
mod registry;

pub use profile::*;
pub use registry::*;

#[cfg(test)]
mod registry_test;
