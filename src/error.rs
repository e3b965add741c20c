// ============================================================
// Error taxonomy
// ============================================================
// Library layers (domain, data, ml, infra) return HuevalError.
// The application and CLI layers wrap it in anyhow with context.
//
// Nothing in the pipeline retries: every variant aborts the run
// and surfaces to the caller unchanged.

use thiserror::Error;

use crate::domain::task::TaskType;

/// Result alias used by every library layer.
pub type Result<T> = std::result::Result<T, HuevalError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HuevalError {
    /// The registry has no dataset with this name.
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    /// The dataset exists but the configuration does not.
    #[error("unknown configuration '{config}' for dataset '{dataset}'")]
    UnknownConfig { dataset: String, config: String },

    /// A corpus file could not be interpreted.
    #[error("parse error in {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// Neither the special-cased nor the generic checkpoint resolved.
    #[error("cannot load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    /// The orchestrator has no aligner/adapter pair for this task type.
    #[error("no adapter registered for task type {0}")]
    UnsupportedTaskType(TaskType),

    #[error("download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("cannot extract archive '{path}': {reason}")]
    Archive { path: String, reason: String },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Train and evaluation splits disagree on the label vocabulary.
    #[error("label column '{column}': {message}")]
    LabelSpace { column: String, message: String },

    #[error("metric error: {0}")]
    Metric(String),

    #[error("training failed: {0}")]
    Training(String),

    /// A burn record could not be written or read back.
    #[error("model record '{path}': {reason}")]
    Record { path: String, reason: String },

    /// A run was asked to move to a state its current state cannot reach.
    #[error("cannot {action} a run that is {state}")]
    InvalidState { action: &'static str, state: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl HuevalError {
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        HuevalError::Parse {
            source_name: source_name.into(),
            message:     message.into(),
        }
    }

    pub fn model_load(model: impl Into<String>, reason: impl Into<String>) -> Self {
        HuevalError::ModelLoad {
            model:  model.into(),
            reason: reason.into(),
        }
    }

    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        HuevalError::Download {
            url:    url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn archive(path: &std::path::Path, reason: impl ToString) -> Self {
        HuevalError::Archive {
            path:   path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn label_space(column: impl Into<String>, message: impl Into<String>) -> Self {
        HuevalError::LabelSpace {
            column:  column.into(),
            message: message.into(),
        }
    }
}
