// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Wraps a tokenizers::Tokenizer as the domain's TextEncoder:
//
//   - every encoding is truncated (longest-first for pairs) and
//     padded to a fixed max_length
//   - word ids are kept so token labels can be aligned
//   - uncased checkpoints lower-case the input text before it
//     reaches the tokenizer and keep their accents
//
// Checkpoints that ship only a BERT vocab.txt get a WordPiece
// tokenizer JSON written next to the vocabulary, then loaded
// with Tokenizer::from_file like any hub tokenizer. Its
// normalizer follows tokenizer_config.json when one sits beside
// vocab.txt:
//
//   do_lower_case   default true
//   strip_accents   default: same as do_lower_case
//
// Reference: Wu et al. (2016) WordPiece

use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::{
    EncodeInput, Encoding, PaddingParams, PaddingStrategy, Tokenizer,
    TruncationDirection, TruncationParams, TruncationStrategy,
};

use crate::domain::traits::{Encoded, TextEncoder};
use crate::error::{HuevalError, Result};

/// File the WordPiece tokenizer built from vocab.txt is saved to.
pub const WORDPIECE_FILE:        &str = "tokenizer.wordpiece.json";
/// Casing options saved by BERT tokenizers next to vocab.txt.
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// Normalizer casing of a WordPiece tokenizer built from vocab.txt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BertCasing {
    pub lowercase:     bool,
    pub strip_accents: bool,
}

impl BertCasing {
    /// Text reaches the vocabulary as written.
    pub const PRESERVE: Self = Self { lowercase: false, strip_accents: false };

    /// Read `do_lower_case` / `strip_accents` from the tokenizer_config.json
    /// in `dir`. A missing file or key means BERT's defaults.
    pub fn from_config_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(TOKENIZER_CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let config: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let lowercase = config
            .get("do_lower_case")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        // null, like an absent key, follows do_lower_case
        let strip_accents = config
            .get("strip_accents")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(lowercase);

        tracing::debug!(
            "Casing from '{}': lowercase={}, strip_accents={}",
            path.display(), lowercase, strip_accents,
        );
        Ok(Self { lowercase, strip_accents })
    }
}

impl Default for BertCasing {
    fn default() -> Self {
        Self { lowercase: true, strip_accents: true }
    }
}

pub struct HfEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
    lowercase:  bool,
}

impl HfEncoder {
    /// Configure fixed-length truncation and padding on `tokenizer`.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize, lowercase: bool) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy:  TruncationStrategy::LongestFirst,
                stride:    0,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| HuevalError::Tokenizer(e.to_string()))?;

        let (pad_id, pad_token) = pad_token(&tokenizer);
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));

        Ok(Self { tokenizer, max_length, lowercase })
    }

    /// Load a tokenizer.json saved by the `tokenizers` library.
    pub fn from_file(path: &Path, max_length: usize, lowercase: bool) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            HuevalError::Tokenizer(format!("cannot load '{}': {e}", path.display()))
        })?;
        tracing::debug!("Loaded tokenizer from {}", path.display());
        Self::new(tokenizer, max_length, lowercase)
    }

    /// Build a BERT WordPiece tokenizer from a vocab.txt file.
    ///
    /// With `lowercase` the input is lower-cased here and the
    /// normalizer is left alone, so accents survive. Otherwise the
    /// normalizer casing comes from tokenizer_config.json.
    pub fn from_vocab(vocab_path: &Path, max_length: usize, lowercase: bool) -> Result<Self> {
        let casing = if lowercase {
            BertCasing::PRESERVE
        } else {
            BertCasing::from_config_dir(vocab_path.parent().unwrap_or_else(|| Path::new(".")))?
        };
        let tok_path = write_wordpiece_json(vocab_path, casing)?;
        Self::from_file(&tok_path, max_length, lowercase)
    }

    fn prepare(&self, text: &str) -> String {
        if self.lowercase { text.to_lowercase() } else { text.to_string() }
    }

    fn run<'s>(&self, input: impl Into<EncodeInput<'s>>) -> Result<Encoded> {
        self.tokenizer
            .encode(input, true)
            .map(to_encoded)
            .map_err(|e| HuevalError::Tokenizer(e.to_string()))
    }
}

impl TextEncoder for HfEncoder {
    fn encode_text(&self, first: &str, second: Option<&str>) -> Result<Encoded> {
        let first = self.prepare(first);
        match second {
            Some(second) => self.run((first, self.prepare(second))),
            None         => self.run(first),
        }
    }

    fn encode_words(&self, words: &[String]) -> Result<Encoded> {
        let words: Vec<String> = words.iter().map(|w| self.prepare(w)).collect();
        self.run(words)
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn encode_batch(&self, pairs: &[(String, Option<String>)]) -> Result<Vec<Encoded>> {
        let inputs: Vec<EncodeInput> = pairs
            .iter()
            .map(|(first, second)| match second {
                Some(second) => (self.prepare(first), self.prepare(second)).into(),
                None         => self.prepare(first).into(),
            })
            .collect();
        self.tokenizer
            .encode_batch(inputs, true)
            .map(|encodings| encodings.into_iter().map(to_encoded).collect())
            .map_err(|e| HuevalError::Tokenizer(e.to_string()))
    }
}

fn to_encoded(encoding: Encoding) -> Encoded {
    Encoded {
        input_ids:      encoding.get_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
        type_ids:       encoding.get_type_ids().to_vec(),
        word_ids:       encoding.get_word_ids().to_vec(),
    }
}

/// Pad with the tokenizer's own pad token when it declares one.
fn pad_token(tokenizer: &Tokenizer) -> (u32, String) {
    if let Some(params) = tokenizer.get_padding() {
        return (params.pad_id, params.pad_token.clone());
    }
    for candidate in ["[PAD]", "<pad>"] {
        if let Some(id) = tokenizer.token_to_id(candidate) {
            return (id, candidate.to_string());
        }
    }
    (0, "[PAD]".to_string())
}

/// Write a WordPiece tokenizer JSON beside `vocab_path` and return its path.
///
/// The file is rewritten on every call; the same vocabulary may be
/// loaded with different casing.
pub fn write_wordpiece_json(vocab_path: &Path, casing: BertCasing) -> Result<PathBuf> {
    let dir = vocab_path.parent().unwrap_or_else(|| Path::new("."));
    let tok_path = dir.join(WORDPIECE_FILE);

    // ── Step 1: Read vocabulary, one token per line, id = line number ────────
    let text = fs::read_to_string(vocab_path)?;
    let mut vocab = serde_json::Map::new();
    for (id, token) in text.lines().enumerate() {
        let token = token.trim_end_matches('\r');
        if !token.is_empty() && !vocab.contains_key(token) {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
    }

    let id_of = |token: &str| -> Result<u64> {
        vocab
            .get(token)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| HuevalError::Tokenizer(format!(
                "'{}' has no {token} entry", vocab_path.display()
            )))
    };
    let (cls, sep) = (id_of("[CLS]")?, id_of("[SEP]")?);

    // ── Step 2: Special tokens present in the vocabulary ─────────────────────
    let added_tokens: Vec<serde_json::Value> = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"]
        .iter()
        .filter_map(|&t| vocab.get(t).map(|id| (t, id.clone())))
        .map(|(t, id)| serde_json::json!({
            "id": id, "content": t, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }))
        .collect();

    // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────────
    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": casing.strip_accents,
            "lowercase": casing.lowercase
        },
        "pre_tokenizer": {
            "type": "BertPreTokenizer"
        },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", sep],
            "cls": ["[CLS]", cls]
        },
        "decoder": {
            "type": "WordPiece",
            "prefix": "##",
            "cleanup": true
        },
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    });

    fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)?;
    tracing::info!("WordPiece tokenizer written to '{}'", tok_path.display());
    Ok(tok_path)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\nalma\nkör\n##te\n.\npiros\n";

    /// `tokenizer_config` is written beside vocab.txt when given.
    fn encoder_with(tokenizer_config: Option<&str>, lowercase: bool) -> (tempfile::TempDir, HfEncoder) {
        let dir   = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.txt");
        fs::write(&vocab, VOCAB).unwrap();
        if let Some(config) = tokenizer_config {
            fs::write(dir.path().join(TOKENIZER_CONFIG_FILE), config).unwrap();
        }
        let enc = HfEncoder::from_vocab(&vocab, 8, lowercase).unwrap();
        (dir, enc)
    }

    /// A cased vocabulary: the normalizer leaves text untouched.
    fn encoder(lowercase: bool) -> (tempfile::TempDir, HfEncoder) {
        encoder_with(Some(r#"{"do_lower_case": false}"#), lowercase)
    }

    #[test]
    fn test_wordpiece_single_text() {
        let (_dir, enc) = encoder(false);
        let e = enc.encode_text("alma körte", None).unwrap();
        assert_eq!(e.input_ids, vec![2, 5, 6, 7, 3, 0, 0, 0]);
        assert_eq!(e.attention_mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(e.word_ids[..5], [None, Some(0), Some(1), Some(1), None]);
    }

    #[test]
    fn test_pair_gets_second_segment() {
        let (_dir, enc) = encoder(false);
        let e = enc.encode_text("alma", Some("piros")).unwrap();
        assert_eq!(e.input_ids[..5], [2, 5, 3, 9, 3]);
        assert_eq!(e.type_ids[..5], [0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_truncates_to_max_length() {
        let (_dir, enc) = encoder(false);
        let e = enc.encode_text("alma alma alma alma alma alma alma alma", None).unwrap();
        assert_eq!(e.len(), 8);
        assert_eq!(e.input_ids[7], 3);
    }

    #[test]
    fn test_pretokenized_words_keep_word_ids() {
        let (_dir, enc) = encoder(false);
        let words = vec!["körte".to_string(), ".".to_string()];
        let e = enc.encode_words(&words).unwrap();
        assert_eq!(e.word_ids[..5], [None, Some(0), Some(0), Some(1), None]);
    }

    #[test]
    fn test_uncased_lowercases_before_lookup() {
        let (_dir, cased)   = encoder(false);
        let (_dir2, lower)  = encoder(true);
        assert_eq!(cased.encode_text("Alma", None).unwrap().input_ids[1], 1);
        assert_eq!(lower.encode_text("Alma", None).unwrap().input_ids[1], 5);
    }

    #[test]
    fn test_missing_tokenizer_config_uses_bert_defaults() {
        let (_dir, enc) = encoder_with(None, false);
        // lower-cased by the normalizer
        assert_eq!(enc.encode_text("Alma", None).unwrap().input_ids[1], 5);
        // ö loses its accent, so "korte" has no entry
        assert_eq!(enc.encode_text("körte", None).unwrap().input_ids[1], 1);
    }

    #[test]
    fn test_tokenizer_config_can_keep_accents() {
        let (_dir, enc) = encoder_with(Some(r#"{"do_lower_case": true, "strip_accents": false}"#), false);
        let e = enc.encode_text("Körte", None).unwrap();
        assert_eq!(e.input_ids[..4], [2, 6, 7, 3]);
    }

    #[test]
    fn test_casing_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BertCasing::from_config_dir(dir.path()).unwrap(), BertCasing::default());

        let path = dir.path().join(TOKENIZER_CONFIG_FILE);
        fs::write(&path, r#"{"do_lower_case": false, "strip_accents": null}"#).unwrap();
        assert_eq!(BertCasing::from_config_dir(dir.path()).unwrap(), BertCasing::PRESERVE);

        fs::write(&path, r#"{"model_max_length": 512}"#).unwrap();
        assert_eq!(BertCasing::from_config_dir(dir.path()).unwrap(), BertCasing::default());
    }

    #[test]
    fn test_manual_lowercase_ignores_tokenizer_config() {
        let (_dir, enc) = encoder_with(None, true);
        // the input is lower-cased up front and accents are kept
        assert_eq!(enc.encode_text("Körte", None).unwrap().input_ids[..4], [2, 6, 7, 3]);
    }

    #[test]
    fn test_batch_matches_single_calls() {
        let (_dir, enc) = encoder(false);
        let pairs = vec![("alma".to_string(), None), ("körte".to_string(), Some("piros".to_string()))];
        let batch = enc.encode_batch(&pairs).unwrap();
        assert_eq!(batch[0], enc.encode_text("alma", None).unwrap());
        assert_eq!(batch[1], enc.encode_text("körte", Some("piros")).unwrap());
    }

    #[test]
    fn test_missing_cls_is_tokenizer_error() {
        let dir   = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.txt");
        fs::write(&vocab, "[PAD]\n[UNK]\nalma\n").unwrap();
        assert!(matches!(
            HfEncoder::from_vocab(&vocab, 8, false),
            Err(HuevalError::Tokenizer(_))
        ));
    }
}
