// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and all their flags:
//
//   datasets — list registered (dataset, config) pairs
//   prepare  — download and parse one corpus
//   train    — fine-tune and score one model on one task
//   sweep    — every benchmark model on every benchmark task
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    sweep_use_case::SweepConfig,
    train_use_case::{default_output_dir, RunConfig},
};
use crate::ml::trainer::TrainingArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available datasets and their configurations
    Datasets(DatasetsArgs),

    /// Download and parse a corpus into the cache
    Prepare(PrepareArgs),

    /// Fine-tune a model on one task and score it
    Train(TrainArgs),

    /// Run (or list) the full model × task benchmark
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
pub struct DatasetsArgs {
    /// Only show configurations of this dataset
    #[arg(long)]
    pub dataset: Option<String>,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Dataset name, e.g. hulu or nytk-nerkor
    pub dataset: String,

    /// Configuration, e.g. cola or news
    pub config: String,

    /// Label column used to check whether the test split is annotated
    #[arg(long, default_value = "labels")]
    pub label_column: String,
}

/// Hyperparameters shared by `train` and `sweep`.
#[derive(Args, Debug, Clone)]
pub struct HyperArgs {
    /// Maximum sequence length in sub-word tokens
    #[arg(long, default_value_t = 256)]
    pub max_length: usize,

    #[arg(long, default_value_t = 8)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub eval_batch_size: usize,

    /// Batches accumulated per optimizer step
    #[arg(long, default_value_t = 4)]
    pub accumulation: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Seed for batch shuffling
    #[arg(long, default_value_t = 0)]
    pub data_seed: u64,

    /// Seed for weight initialisation
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Write the fine-tuned encoder to the run directory
    #[arg(long)]
    pub save_model: bool,
}

impl From<&HyperArgs> for TrainingArgs {
    fn from(a: &HyperArgs) -> Self {
        TrainingArgs {
            train_batch_size: a.train_batch_size,
            eval_batch_size:  a.eval_batch_size,
            accumulation:     a.accumulation,
            learning_rate:    a.learning_rate,
            epochs:           a.epochs,
            data_seed:        a.data_seed,
            seed:             a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Model identifier: hubert-wiki-cased, hubert-wiki-uncased,
    /// a hub repository or a local checkpoint directory
    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub dataset: String,

    #[arg(long)]
    pub config: String,

    /// Label column to predict (labels, ner, upos or label)
    #[arg(long, default_value = "labels")]
    pub label_column: String,

    /// Give every sub-token of a word the word's label
    #[arg(long)]
    pub label_all_tokens: bool,

    /// Run directory; defaults to runs/<model>/<dataset>-<config>-<label>
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

/// Boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<TrainArgs> for RunConfig {
    fn from(a: TrainArgs) -> Self {
        let output_dir = a.output_dir.unwrap_or_else(|| {
            default_output_dir(
                std::path::Path::new("runs"),
                &a.model,
                &a.dataset,
                &a.config,
                &a.label_column,
            )
        });
        RunConfig {
            max_length:       a.hyper.max_length,
            training:         TrainingArgs::from(&a.hyper),
            save_model:       a.hyper.save_model,
            label_all_tokens: a.label_all_tokens,
            output_dir,
            ..RunConfig::new(a.model, a.dataset, a.config, a.label_column)
        }
    }
}

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Root directory for all run directories and the summary CSV
    #[arg(long, default_value = "runs")]
    pub output_root: PathBuf,

    /// Only run models whose name contains this text
    #[arg(long)]
    pub model: Option<String>,

    /// Only run tasks on this dataset
    #[arg(long)]
    pub dataset: Option<String>,

    /// Print the plan without training anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

impl From<&SweepArgs> for SweepConfig {
    fn from(a: &SweepArgs) -> Self {
        SweepConfig {
            output_root:    a.output_root.clone(),
            training:       TrainingArgs::from(&a.hyper),
            max_length:     a.hyper.max_length,
            save_model:     a.hyper.save_model,
            model_filter:   a.model.clone(),
            dataset_filter: a.dataset.clone(),
        }
    }
}
