use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::row::IGNORE_INDEX;
use crate::domain::traits::Encoded;

/// Gold label of one aligned example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExampleLabel {
    /// Sequence classification and multiple choice; may be the unknown sentinel
    Class(i64),
    /// One label per sub-token, IGNORE_INDEX where the loss must skip
    Sequence(Vec<i64>),
}

impl ExampleLabel {
    /// Flat label values as they enter the batch tensor.
    pub fn values(&self) -> Vec<i64> {
        match self {
            ExampleLabel::Class(l)    => vec![*l],
            ExampleLabel::Sequence(s) => s.clone(),
        }
    }
}

/// One tokenised corpus row.
/// Sequence and token tasks carry a single encoding, multiple-choice
/// tasks one encoding per choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub idx:    i64,
    pub inputs: Vec<Encoded>,
    pub label:  ExampleLabel,
}

impl Example {
    pub fn num_choices(&self) -> usize {
        self.inputs.len()
    }

    pub fn seq_len(&self) -> usize {
        self.inputs.first().map(Encoded::len).unwrap_or(0)
    }

    /// Number of positions that contribute to the loss.
    pub fn scored_positions(&self) -> usize {
        match &self.label {
            ExampleLabel::Class(_)    => 1,
            ExampleLabel::Sequence(s) => s.iter().filter(|&&l| l != IGNORE_INDEX).count(),
        }
    }
}

pub struct ExampleDataset {
    examples: Vec<Example>,
}

impl ExampleDataset {
    pub fn new(examples: Vec<Example>) -> Self { Self { examples } }

    pub fn examples(&self) -> &[Example] { &self.examples }
}

impl Dataset<Example> for ExampleDataset {
    fn get(&self, index: usize) -> Option<Example> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
