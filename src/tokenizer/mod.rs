// ABOUTME: Tokenizer module - BPE token counting for chat messages and requests.
// ABOUTME: Encoders are shared process-wide; counting adds per-model framing overheads.

mod encoder;
mod tokenizer;

pub use encoder::*;
pub use tokenizer::*;
