// ============================================================
// Layer 4 — Token-Classification Aligner
// ============================================================
// Word-level tags → sub-token tags.
//
//   words:     Budapesten   él
//   sub-words: [CLS] Buda ##pesten él [SEP] [PAD]
//   word ids:  None  0    0        1  None  None
//   labels:    -100  B-LOC -100    O  -100  -100
//
// Only the first sub-token of a word carries its label unless
// `label_all_tokens` is set. Words whose own tag is absent (-1)
// are ignored as well.

use crate::data::aligner::Aligner;
use crate::data::dataset::{Example, ExampleLabel};
use crate::domain::row::{CorpusRow, LabelRef, IGNORE_INDEX};
use crate::domain::traits::TextEncoder;
use crate::error::{HuevalError, Result};

#[derive(Debug, Clone)]
pub struct TokenAligner {
    label_column:     String,
    label_all_tokens: bool,
}

impl TokenAligner {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self { label_column: label_column.into(), label_all_tokens: false }
    }

    pub fn with_label_all_tokens(mut self, label_all_tokens: bool) -> Self {
        self.label_all_tokens = label_all_tokens;
        self
    }
}

impl Aligner for TokenAligner {
    fn align_batch(&self, rows: &[CorpusRow], encoder: &dyn TextEncoder) -> Result<Vec<Example>> {
        rows.iter()
            .map(|row| {
                let words = row.tokens().ok_or_else(|| {
                    HuevalError::parse(format!("row {}", row.idx), "row has no pre-split tokens")
                })?;
                let tags = match row.label(&self.label_column) {
                    Some(LabelRef::Sequence(tags)) => tags,
                    _ => {
                        return Err(HuevalError::label_space(
                            &self.label_column,
                            format!("row {} has no tag sequence in this column", row.idx),
                        ))
                    }
                };

                let encoded = encoder.encode_words(words)?;
                let labels  = align_word_labels(&encoded.word_ids, tags, self.label_all_tokens);
                Ok(Example {
                    idx:    row.idx,
                    inputs: vec![encoded],
                    label:  ExampleLabel::Sequence(labels),
                })
            })
            .collect()
    }
}

/// Project word labels onto sub-token positions.
pub fn align_word_labels(word_ids: &[Option<u32>], word_labels: &[i64], label_all_tokens: bool) -> Vec<i64> {
    let mut previous: Option<u32> = None;
    word_ids
        .iter()
        .map(|&word| {
            let label = match word {
                None => IGNORE_INDEX,
                Some(w) => {
                    let tag = word_labels
                        .get(w as usize)
                        .copied()
                        .filter(|&t| t >= 0)
                        .unwrap_or(IGNORE_INDEX);
                    if previous != Some(w) || label_all_tokens { tag } else { IGNORE_INDEX }
                }
            };
            previous = word;
            label
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aligner::fake::PieceEncoder;
    use crate::domain::row::{RowBody, TaggedSentence};

    #[test]
    fn test_continuation_tokens_are_ignored() {
        let word_ids = [None, Some(0), Some(0), Some(1), None, None];
        let labels   = align_word_labels(&word_ids, &[5, 0], false);
        assert_eq!(labels, vec![-100, 5, -100, 0, -100, -100]);
    }

    #[test]
    fn test_label_all_tokens_copies_word_label() {
        let word_ids = [None, Some(0), Some(0), Some(1), None];
        let labels   = align_word_labels(&word_ids, &[5, 0], true);
        assert_eq!(labels, vec![-100, 5, 5, 0, -100]);
    }

    #[test]
    fn test_absent_word_label_is_ignored() {
        let word_ids = [None, Some(0), Some(1), None];
        let labels   = align_word_labels(&word_ids, &[-1, 3], false);
        assert_eq!(labels, vec![-100, -100, 3, -100]);
    }

    #[test]
    fn test_repeated_word_ids_always_ignored() {
        let encoder = PieceEncoder { max_length: 16 };
        let words: Vec<String> = ["Árvíztűrő", "tükörfúrógép", "és", "Budapest"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = CorpusRow::new(0, 0, RowBody::Tagged(TaggedSentence {
            tokens: words.clone(),
            ner:    vec![0, 1, 0, 5],
            ..TaggedSentence::default()
        }));

        let examples = TokenAligner::new("ner").align_batch(&[row], &encoder).unwrap();
        let encoded  = &examples[0].inputs[0];
        let labels   = match &examples[0].label {
            ExampleLabel::Sequence(l) => l.clone(),
            other => panic!("unexpected label {other:?}"),
        };
        assert_eq!(labels.len(), encoded.len());
        for i in 1..encoded.word_ids.len() {
            let current = encoded.word_ids[i];
            if current.is_some() && current == encoded.word_ids[i - 1] {
                assert_eq!(labels[i], IGNORE_INDEX, "position {i}");
            }
        }
        let first_pieces: Vec<i64> = labels.iter().copied().filter(|&l| l != IGNORE_INDEX).collect();
        assert_eq!(first_pieces, vec![0, 1, 0, 5]);
    }

    #[test]
    fn test_upos_column_is_selectable() {
        let encoder = PieceEncoder { max_length: 8 };
        let row = CorpusRow::new(0, 0, RowBody::Tagged(TaggedSentence {
            tokens: vec!["A".into(), "ház".into()],
            upos:   vec![5, 7],
            ner:    vec![0, 0],
            ..TaggedSentence::default()
        }));
        let examples = TokenAligner::new("upos").align_batch(&[row], &encoder).unwrap();
        assert_eq!(
            examples[0].label,
            ExampleLabel::Sequence(vec![-100, 5, 7, -100, -100, -100, -100, -100])
        );
    }
}
