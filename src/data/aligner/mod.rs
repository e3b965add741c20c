// ============================================================
// Layer 4 — Label Aligners
// ============================================================
// Turn corpus rows into tokenised Examples whose labels line up
// with the model's outputs. One aligner per trainable task type:
//
//   SequenceAligner        one or two text columns → one label
//   TokenAligner           pre-split words → one label per sub-token
//   MultipleChoiceAligner  context × k choices → one label per row
//
// Rows are processed in fixed batches of ALIGN_BATCH_SIZE. An
// aligner holds only its static configuration; nothing carries
// over from one batch to the next. Truncation and padding are the
// encoder's job.

use crate::data::dataset::Example;
use crate::domain::row::{CorpusRow, LabelRef};
use crate::domain::traits::TextEncoder;
use crate::error::{HuevalError, Result};

pub mod multiple_choice;
pub mod sequence;
pub mod token;

pub use multiple_choice::MultipleChoiceAligner;
pub use sequence::SequenceAligner;
pub use token::TokenAligner;

pub const ALIGN_BATCH_SIZE: usize = 8;

pub trait Aligner {
    /// Tokenise one batch of rows.
    fn align_batch(&self, rows: &[CorpusRow], encoder: &dyn TextEncoder) -> Result<Vec<Example>>;
}

/// Align every row of a split, batch by batch, preserving order.
pub fn align_rows(
    aligner: &dyn Aligner,
    rows:    &[CorpusRow],
    encoder: &dyn TextEncoder,
) -> Result<Vec<Example>> {
    let mut examples = Vec::with_capacity(rows.len());
    for batch in rows.chunks(ALIGN_BATCH_SIZE) {
        examples.extend(aligner.align_batch(batch, encoder)?);
    }
    Ok(examples)
}

pub(crate) fn text_column<'a>(row: &'a CorpusRow, column: &str) -> Result<&'a str> {
    row.text(column).ok_or_else(|| {
        HuevalError::parse(format!("row {}", row.idx), format!("no text column '{column}'"))
    })
}

pub(crate) fn class_label(row: &CorpusRow, column: &str) -> Result<i64> {
    match row.label(column) {
        Some(LabelRef::Class(label)) => Ok(label),
        _ => Err(HuevalError::label_space(
            column,
            format!("row {} has no class label in this column", row.idx),
        )),
    }
}


// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::RowBody;

    struct Echo;

    impl Aligner for Echo {
        fn align_batch(&self, rows: &[CorpusRow], _: &dyn TextEncoder) -> Result<Vec<Example>> {
            assert!(rows.len() <= ALIGN_BATCH_SIZE);
            Ok(rows
                .iter()
                .map(|r| Example {
                    idx:    r.idx,
                    inputs: Vec::new(),
                    label:  crate::data::dataset::ExampleLabel::Class(0),
                })
                .collect())
        }
    }

    #[test]
    fn test_rows_are_aligned_in_batches_of_eight_in_order() {
        let rows: Vec<CorpusRow> = (0..19)
            .map(|i| CorpusRow::new(i, 100 + i as i64, RowBody::Sentence { sentence: "x".into(), label: 0 }))
            .collect();
        let encoder  = fake::PieceEncoder { max_length: 8 };
        let examples = align_rows(&Echo, &rows, &encoder).unwrap();
        let idx: Vec<i64> = examples.iter().map(|e| e.idx).collect();
        assert_eq!(idx, (100..119).collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_columns_are_errors() {
        let row = CorpusRow::new(0, 3, RowBody::Sentence { sentence: "x".into(), label: 1 });
        assert!(text_column(&row, "premise").is_err());
        assert_eq!(class_label(&row, "labels").unwrap(), 1);
        assert!(matches!(class_label(&row, "ner"), Err(HuevalError::LabelSpace { .. })));
    }
}
