// ============================================================
// Layer 4 — Multiple-Choice Aligner
// ============================================================
// For a row with k choices the shared context is repeated k
// times and paired with each choice:
//
//   row:   premise P, choices [C1, C2]
//   pairs: (P, C1) (P, C2)
//
// All pairs of a batch are encoded in one flat call and then
// regrouped, k at a time, back onto their rows.
//
//   copa: context = premise
//   ws:   context = "{sentence} {question}"

use crate::data::aligner::{class_label, text_column, Aligner};
use crate::data::dataset::{Example, ExampleLabel};
use crate::domain::row::CorpusRow;
use crate::domain::task::TaskDescriptor;
use crate::domain::traits::TextEncoder;
use crate::error::{HuevalError, Result};

const CHOICE_COLUMNS: [&str; 2] = ["choice1", "choice2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Premise,
    SentenceAndQuestion,
}

#[derive(Debug, Clone)]
pub struct MultipleChoiceAligner {
    context:      Context,
    label_column: String,
}

impl MultipleChoiceAligner {
    pub fn for_task(descriptor: &TaskDescriptor, label_column: impl Into<String>) -> Result<Self> {
        let context = match descriptor.config {
            "copa" => Context::Premise,
            "ws"   => Context::SentenceAndQuestion,
            _ => {
                return Err(HuevalError::UnknownConfig {
                    dataset: descriptor.dataset.to_string(),
                    config:  descriptor.config.to_string(),
                })
            }
        };
        Ok(Self { context, label_column: label_column.into() })
    }

    fn context_of(&self, row: &CorpusRow) -> Result<String> {
        match self.context {
            Context::Premise => Ok(text_column(row, "premise")?.to_string()),
            Context::SentenceAndQuestion => Ok(format!(
                "{} {}",
                text_column(row, "sentence")?,
                text_column(row, "question")?,
            )),
        }
    }
}

impl Aligner for MultipleChoiceAligner {
    fn align_batch(&self, rows: &[CorpusRow], encoder: &dyn TextEncoder) -> Result<Vec<Example>> {
        let mut pairs = Vec::with_capacity(rows.len() * CHOICE_COLUMNS.len());
        for row in rows {
            let context = self.context_of(row)?;
            for column in CHOICE_COLUMNS {
                pairs.push((context.clone(), Some(text_column(row, column)?.to_string())));
            }
        }

        let flat   = encoder.encode_batch(&pairs)?;
        let groups = regroup(flat, CHOICE_COLUMNS.len());

        rows.iter()
            .zip(groups)
            .map(|(row, inputs)| {
                Ok(Example {
                    idx: row.idx,
                    inputs,
                    label: ExampleLabel::Class(class_label(row, &self.label_column)?),
                })
            })
            .collect()
    }
}

/// Split a flat list into consecutive groups of `k`, keeping order.
/// A trailing remainder shorter than `k` forms its own group.
pub fn regroup<T>(flat: Vec<T>, k: usize) -> Vec<Vec<T>> {
    if k == 0 {
        return Vec::new();
    }
    let mut groups = Vec::with_capacity(flat.len().div_ceil(k));
    let mut iter   = flat.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(k).collect());
    }
    groups
}
