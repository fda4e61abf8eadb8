// ABOUTME: Command module - SQL and RLS policy assistant commands.
// ABOUTME: Thin wrappers that build prompts, cap history, and call the completion API.

mod markdown;
mod repair;
mod rls;
mod sql;

pub use markdown::*;
pub use rls::*;
pub use sql::*;

#[cfg(test)]
mod test_support;
