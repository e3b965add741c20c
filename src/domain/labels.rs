// ============================================================
// Layer 3 — Label Vocabularies
// ============================================================
// Every label column carries a fixed, ordered list of class
// names. The position of a name in the list is the integer the
// corpus rows store and the index the model head predicts.
//
// Example:
//   ClassLabel ["negative", "neutral", "positive"]
//   "neutral" ↔ 1

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{HuevalError, Result};

/// Ordered class names for one label column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    names: Vec<String>,
}

impl ClassLabel {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    /// BIO vocabulary: "O" followed by B-/I- pairs for every tag.
    pub fn bio<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut names = vec!["O".to_string()];
        for tag in tags {
            names.push(format!("B-{}", tag.as_ref()));
            names.push(format!("I-{}", tag.as_ref()));
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<i64> {
        self.names.iter().position(|n| n == name).map(|i| i as i64)
    }

    /// Class name for an index. Negative indices are sentinels and have no name.
    pub fn name(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Like `index_of`, but an unknown name is a parse error of `source`.
    pub fn encode(&self, name: &str, source: &str) -> Result<i64> {
        self.index_of(name).ok_or_else(|| {
            HuevalError::parse(
                source,
                format!("label '{name}' is not one of {:?}", self.names),
            )
        })
    }
}

/// Label vocabularies recorded on a split, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    labels: BTreeMap<String, ClassLabel>,
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, column: impl Into<String>, label: ClassLabel) -> Self {
        self.labels.insert(column.into(), label);
        self
    }

    pub fn label(&self, column: &str) -> Option<&ClassLabel> {
        self.labels.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}
