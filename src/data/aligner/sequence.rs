// Sequence-classification aligner: one or two text columns per row,
// selected by configuration, and a label that passes through as is.

use crate::data::aligner::{class_label, text_column, Aligner};
use crate::data::dataset::{Example, ExampleLabel};
use crate::domain::row::CorpusRow;
use crate::domain::task::TaskDescriptor;
use crate::domain::traits::TextEncoder;
use crate::error::{HuevalError, Result};

/// Text columns of each sequence-classification configuration.
pub fn text_columns(config: &str) -> Option<(&'static str, Option<&'static str>)> {
    match config {
        "cola" | "sst2" => Some(("sentence", None)),
        "wnli"          => Some(("sentence1", Some("sentence2"))),
        "opinhubank"    => Some(("entity", Some("sentence"))),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct SequenceAligner {
    first:        &'static str,
    second:       Option<&'static str>,
    label_column: String,
}

impl SequenceAligner {
    pub fn for_task(descriptor: &TaskDescriptor, label_column: impl Into<String>) -> Result<Self> {
        let (first, second) = text_columns(descriptor.config).ok_or_else(|| HuevalError::UnknownConfig {
            dataset: descriptor.dataset.to_string(),
            config:  descriptor.config.to_string(),
        })?;
        Ok(Self { first, second, label_column: label_column.into() })
    }
}

impl Aligner for SequenceAligner {
    fn align_batch(&self, rows: &[CorpusRow], encoder: &dyn TextEncoder) -> Result<Vec<Example>> {
        let pairs = rows
            .iter()
            .map(|row| {
                let first  = text_column(row, self.first)?.to_string();
                let second = match self.second {
                    Some(column) => Some(text_column(row, column)?.to_string()),
                    None => None,
                };
                Ok((first, second))
            })
            .collect::<Result<Vec<_>>>()?;

        let encoded = encoder.encode_batch(&pairs)?;

        rows.iter()
            .zip(encoded)
            .map(|(row, input)| {
                Ok(Example {
                    idx:    row.idx,
                    inputs: vec![input],
                    label:  ExampleLabel::Class(class_label(row, &self.label_column)?),
                })
            })
            .collect()
    }
}
