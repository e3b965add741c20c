// ============================================================
// Layer 3 — Task Descriptors
// ============================================================
// A task descriptor ties a (dataset, configuration) pair to the
// structural kind of benchmark it is and the metric it reports.
// Descriptors are static values created when the registry is
// built and never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural category of a benchmark.
/// Exactly one applies to every registered configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// One label per sentence or sentence pair
    SequenceClassification,
    /// One label per word
    TokenClassification,
    /// Pick one of several candidate continuations
    MultipleChoiceQa,
    /// Point at an answer span inside a passage
    SpanClassification,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::SequenceClassification,
        TaskType::TokenClassification,
        TaskType::MultipleChoiceQa,
        TaskType::SpanClassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::SequenceClassification => "sequence-classification",
            TaskType::TokenClassification    => "token-classification",
            TaskType::MultipleChoiceQa       => "multiple-choice-qa",
            TaskType::SpanClassification     => "span-classification",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric a configuration is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricId {
    Accuracy,
    /// GLUE CoLA reports Matthews correlation
    MatthewsCorrelation,
    /// Entity-level precision / recall / F1
    Seqeval,
    /// SuperGLUE ReCoRD exact match and token F1
    Record,
}

impl MetricId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Accuracy            => "accuracy",
            MetricId::MatthewsCorrelation => "matthews_correlation",
            MetricId::Seqeval             => "seqeval",
            MetricId::Record              => "record",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (dataset, configuration) → (task type, metric)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskDescriptor {
    pub dataset:   &'static str,
    pub config:    &'static str,
    pub task_type: TaskType,
    pub metric:    MetricId,
}

impl TaskDescriptor {
    pub const fn new(
        dataset:   &'static str,
        config:    &'static str,
        task_type: TaskType,
        metric:    MetricId,
    ) -> Self {
        Self { dataset, config, task_type, metric }
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}, {})", self.dataset, self.config, self.task_type, self.metric)
    }
}
