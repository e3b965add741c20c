// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Runs one model × task combination end to end:
//
//   Step 1: Write run_config.json         (Layer 6 - infra)
//   Step 2: Load corpus, build head,      (Layers 4, 5, 6)
//           tokenise every split
//   Step 3: Fine-tune with per-epoch      (Layer 5 - ml)
//           validation
//   Step 4: Score the test split, unless  (Layer 5 - ml)
//           it has no gold labels
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::training::Training;
use crate::data::registry::DatasetRegistry;
use crate::domain::task::TaskDescriptor;
use crate::infra::{checkpoint::save_run_config, download::Fetcher};
use crate::ml::{scoring::Scores, trainer::TrainingArgs};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Default maximum sequence length in tokens.
pub const DEFAULT_MAX_LENGTH: usize = 256;

// ─── Run Configuration ────────────────────────────────────────────────────────
// Everything that defines one run. Written next to the run's
// outputs so results can be traced back to their settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub model:            String,
    pub dataset:          String,
    pub config:           String,
    pub label_column:     String,
    pub max_length:       usize,
    pub training:         TrainingArgs,
    pub output_dir:       PathBuf,
    /// Copy sub-word labels onto continuation tokens
    pub label_all_tokens: bool,
    /// Write the trained encoder as a checkpoint directory
    pub save_model:       bool,
}

impl RunConfig {
    pub fn new(
        model:        impl Into<String>,
        dataset:      impl Into<String>,
        config:       impl Into<String>,
        label_column: impl Into<String>,
    ) -> Self {
        let (model, dataset, config, label_column) =
            (model.into(), dataset.into(), config.into(), label_column.into());
        let output_dir = default_output_dir(Path::new("runs"), &model, &dataset, &config, &label_column);
        Self {
            model,
            dataset,
            config,
            label_column,
            max_length: DEFAULT_MAX_LENGTH,
            training: TrainingArgs::default(),
            output_dir,
            label_all_tokens: false,
            save_model: false,
        }
    }
}

/// `<root>/<model>/<dataset>-<config>-<label>`, with `/` in hub names
/// replaced so every run gets one directory level per model.
pub fn default_output_dir(root: &Path, model: &str, dataset: &str, config: &str, label: &str) -> PathBuf {
    let model = model.trim_end_matches('/').replace(['/', '\\'], "__");
    root.join(model).join(format!("{dataset}-{config}-{label}"))
}

/// What gets written to run_config.json.
#[derive(Serialize)]
struct RunManifest<'a> {
    #[serde(flatten)]
    run:  &'a RunConfig,
    task: TaskDescriptor,
}

/// Scores of a finished run; `test` is None when the test split
/// has no gold labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub output_dir: PathBuf,
    pub test:       Option<Scores>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<'a> {
    config:   RunConfig,
    registry: &'a DatasetRegistry,
    fetcher:  &'a Fetcher,
}

impl<'a> TrainUseCase<'a> {
    pub fn new(config: RunConfig, registry: &'a DatasetRegistry, fetcher: &'a Fetcher) -> Self {
        Self { config, registry, fetcher }
    }

    /// Execute the run end to end
    pub fn execute(&self) -> Result<RunOutcome> {
        let cfg = &self.config;
        tracing::info!(
            "Run: model='{}' task={}/{} label={}",
            cfg.model, cfg.dataset, cfg.config, cfg.label_column,
        );

        // ── Step 1: Save run configuration ────────────────────────────────────
        let task = self.registry.descriptor(&cfg.dataset, &cfg.config)?;
        save_run_config(&cfg.output_dir, &RunManifest { run: cfg, task })?;

        // ── Step 2: Corpus, head, tokenised splits ────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        let mut training =
            Training::<MyBackend>::prepare(cfg.clone(), self.registry, self.fetcher, device)?;

        // ── Step 3: Fine-tune ─────────────────────────────────────────────────
        training.train()?;

        // ── Step 4: Held-out evaluation ───────────────────────────────────────
        let test = training.eval()?.map(|evaluation| evaluation.scores);
        match &test {
            Some(scores) => tracing::info!("Test scores: {:?}", scores),
            None         => tracing::info!("No test scores for {}/{}", cfg.dataset, cfg.config),
        }

        Ok(RunOutcome { output_dir: cfg.output_dir.clone(), test })
    }
}
