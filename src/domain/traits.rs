// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The aligners only need "turn text into ids, and tell me which
// word each id came from". TextEncoder captures exactly that, so
// aligners can be exercised with a tiny in-memory encoder and the
// real implementation (tokenizers::Tokenizer) lives in Layer 6.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Output of one tokenizer call, already truncated and padded
/// to the encoder's fixed length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoded {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub type_ids:       Vec<u32>,
    /// Source word of every position; None for special and padding tokens
    pub word_ids:       Vec<Option<u32>>,
}

impl Encoded {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

// ─── TextEncoder ──────────────────────────────────────────────────────────────
/// Any sub-word tokenizer with fixed-length output.
///
/// Implementations:
///   - HfEncoder → wraps a `tokenizers::Tokenizer`
pub trait TextEncoder {
    /// Encode one text, or a text pair joined by the model's separator.
    fn encode_text(&self, first: &str, second: Option<&str>) -> Result<Encoded>;

    /// Encode a sentence that is already split into words.
    fn encode_words(&self, words: &[String]) -> Result<Encoded>;

    /// Length every encoding is padded or truncated to.
    fn max_length(&self) -> usize;

    /// Encode many pairs at once. The default walks them in order.
    fn encode_batch(&self, pairs: &[(String, Option<String>)]) -> Result<Vec<Encoded>> {
        pairs
            .iter()
            .map(|(first, second)| self.encode_text(first, second.as_deref()))
            .collect()
    }
}
