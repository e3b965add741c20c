// ============================================================
// Layer 3 — Corpus and Splits
// ============================================================
// A loaded corpus always has exactly three splits. Each split
// carries its rows plus the label vocabularies of its columns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::labels::{ClassLabel, Features};
use crate::domain::row::{CorpusRow, LabelRef};
use crate::domain::task::TaskDescriptor;
use crate::error::{HuevalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train      => "train",
            Split::Validation => "validation",
            Split::Test       => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSplit {
    pub split:    Split,
    pub rows:     Vec<CorpusRow>,
    pub features: Features,
}

impl CorpusSplit {
    pub fn new(split: Split, rows: Vec<CorpusRow>, features: Features) -> Self {
        Self { split, rows, features }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// False when the split ships only sentinel labels for `column`.
    /// Only the first row is inspected: a split is either fully
    /// annotated or fully unannotated.
    pub fn has_gold_labels(&self, column: &str) -> bool {
        match self.rows.first().and_then(|r| r.label(column)) {
            Some(label) => !label.is_unknown(),
            None        => false,
        }
    }

    /// Keep only rows matching `keep`, renumbering keys from zero.
    pub fn retain(&mut self, keep: impl Fn(&CorpusRow) -> bool) {
        self.rows.retain(|r| keep(r));
        for (key, row) in self.rows.iter_mut().enumerate() {
            row.key = key;
        }
    }
}

/// Three splits plus the descriptor they were loaded under.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub descriptor: TaskDescriptor,
    pub train:      CorpusSplit,
    pub validation: CorpusSplit,
    pub test:       CorpusSplit,
}

impl Corpus {
    pub fn split(&self, split: Split) -> &CorpusSplit {
        match split {
            Split::Train      => &self.train,
            Split::Validation => &self.validation,
            Split::Test       => &self.test,
        }
    }

    pub fn splits(&self) -> [&CorpusSplit; 3] {
        [&self.train, &self.validation, &self.test]
    }

    pub fn retain(&mut self, keep: impl Fn(&CorpusRow) -> bool) {
        self.train.retain(&keep);
        self.validation.retain(&keep);
        self.test.retain(&keep);
    }

    /// The label vocabulary recorded on the training split for `column`,
    /// checked against the evaluation splits.
    pub fn label_space(&self, column: &str) -> Result<&ClassLabel> {
        let label = self.train.features.label(column).ok_or_else(|| {
            HuevalError::label_space(
                column,
                format!("no label vocabulary recorded on the train split of {}", self.descriptor),
            )
        })?;

        for split in [&self.validation, &self.test] {
            if split.features.label(column) != Some(label) {
                return Err(HuevalError::label_space(
                    column,
                    format!("{} split disagrees with train split", split.split),
                ));
            }
        }
        Ok(label)
    }

    /// Output size of a classification head for `column`.
    pub fn num_labels(&self, column: &str) -> Result<usize> {
        self.label_space(column).map(ClassLabel::len)
    }

    /// All class values present in a split's `column`, skipping sentinels.
    pub fn observed_labels(&self, split: Split, column: &str) -> Vec<i64> {
        let mut seen: Vec<i64> = self
            .split(split)
            .rows
            .iter()
            .filter_map(|r| r.label(column))
            .flat_map(|l| match l {
                LabelRef::Class(c)    => vec![c],
                LabelRef::Sequence(s) => s.to_vec(),
                LabelRef::Answer(_)   => Vec::new(),
            })
            .filter(|&l| l >= 0)
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen
    }
}
