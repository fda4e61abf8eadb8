// ABOUTME: Encoder trait and the tiktoken-backed byte-pair encoder.
// ABOUTME: Each BPE table is loaded once per process and only read afterwards.

use once_cell::sync::OnceCell;
use tiktoken_rs::CoreBPE;

use crate::error::TokenizerError;
use crate::model::Encoding;

/// Counts the tokens a piece of text encodes to.
///
/// Implementations must be pure: the same text always yields the same count.
pub trait Encoder: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Byte-pair encoder backed by a tiktoken table.
pub struct BpeEncoder {
    encoding: Encoding,
    bpe: CoreBPE,
}

static CL100K_BASE: OnceCell<BpeEncoder> = OnceCell::new();
static O200K_BASE: OnceCell<BpeEncoder> = OnceCell::new();

impl BpeEncoder {
    /// Load a fresh encoder for the given table.
    pub fn load(encoding: Encoding) -> Result<Self, TokenizerError> {
        let bpe = match encoding {
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| TokenizerError::Load {
            encoding: encoding.as_str(),
            source: e.into(),
        })?;

        Ok(Self { encoding, bpe })
    }

    /// Process-wide encoder for the given table, loaded on first use.
    pub fn shared(encoding: Encoding) -> Result<&'static BpeEncoder, TokenizerError> {
        let cell = match encoding {
            Encoding::Cl100kBase => &CL100K_BASE,
            Encoding::O200kBase => &O200K_BASE,
        };
        cell.get_or_try_init(|| {
            tracing::debug!(encoding = encoding.as_str(), "loading BPE table");
            Self::load(encoding)
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Encoder for BpeEncoder {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for BpeEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeEncoder")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
