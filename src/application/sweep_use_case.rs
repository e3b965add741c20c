// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Every benchmark model × every benchmark task, one run at a
// time. A failed pair is logged and the sweep moves on; each
// finished pair is appended to <root>/sweep_summary.csv.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::application::train_use_case::{default_output_dir, RunConfig, TrainUseCase};
use crate::data::registry::DatasetRegistry;
use crate::infra::download::Fetcher;
use crate::ml::{scoring::headline_key, trainer::TrainingArgs};

/// Models compared by the benchmark.
pub const MODELS: [&str; 14] = [
    "SzegedAI/hubert-tiny-wiki-seq128",
    "SzegedAI/hubert-tiny-wiki",
    "SzegedAI/hubert-small-wiki-seq128",
    "SzegedAI/hubert-small-wiki",
    "SzegedAI/hubert-medium-wiki-seq128",
    "SzegedAI/hubert-medium-wiki",
    "hubert-wiki-cased",
    "hubert-wiki-uncased",
    "SZTAKI-HLT/hubert-base-cc",
    "xlm-roberta-base",
    "xlm-roberta-large",
    "bert-base-multilingual-cased",
    "distilbert-base-multilingual-cased",
    "google/rembert",
];

/// (dataset, configuration, label column) triples of the benchmark.
pub const TASKS: [(&str, &str, &str); 19] = [
    ("hulu", "cola", "labels"),
    ("hulu", "sst2", "labels"),
    ("hulu", "wnli", "labels"),
    ("hulu", "copa", "labels"),
    ("hulu", "ws", "labels"),
    ("nytk-nerkor", "fiction", "ner"),
    ("nytk-nerkor", "legal", "ner"),
    ("nytk-nerkor", "news", "upos"),
    ("nytk-nerkor", "news", "ner"),
    ("nytk-nerkor", "web", "upos"),
    ("nytk-nerkor", "web", "ner"),
    ("nytk-nerkor", "wikipedia", "upos"),
    ("nytk-nerkor", "wikipedia", "ner"),
    ("nerkor_1.41e", "fiction", "ner"),
    ("nerkor_1.41e", "legal", "ner"),
    ("nerkor_1.41e", "news", "ner"),
    ("nerkor_1.41e", "web", "ner"),
    ("nerkor_1.41e", "wikipedia", "ner"),
    ("opinhubank", "opinhubank", "label"),
];

pub const SUMMARY_FILE: &str = "sweep_summary.csv";

// ─── Sweep settings ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub output_root: PathBuf,
    pub training:    TrainingArgs,
    pub max_length:  usize,
    pub save_model:  bool,
    /// Keep only pairs whose model contains this substring
    pub model_filter:   Option<String>,
    /// Keep only pairs on this dataset
    pub dataset_filter: Option<String>,
}

impl SweepConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root:    output_root.into(),
            training:       TrainingArgs::default(),
            max_length:     crate::application::train_use_case::DEFAULT_MAX_LENGTH,
            save_model:     false,
            model_filter:   None,
            dataset_filter: None,
        }
    }

    /// Every (model, task) pair that passes the filters, models outermost.
    pub fn plan(&self) -> Vec<RunConfig> {
        let mut runs = Vec::new();
        for model in MODELS {
            if let Some(filter) = &self.model_filter {
                if !model.contains(filter.as_str()) {
                    continue;
                }
            }
            for (dataset, config, label) in TASKS {
                if self.dataset_filter.as_deref().is_some_and(|d| d != dataset) {
                    continue;
                }
                runs.push(RunConfig {
                    max_length:   self.max_length,
                    training:     self.training.clone(),
                    output_dir:   default_output_dir(&self.output_root, model, dataset, config, label),
                    save_model:   self.save_model,
                    ..RunConfig::new(model, dataset, config, label)
                });
            }
        }
        runs
    }
}

/// One line of the sweep summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRecord {
    pub model:   String,
    pub dataset: String,
    pub config:  String,
    pub label:   String,
    pub status:  String,
    pub metric:  String,
    pub score:   Option<f64>,
}

impl SweepRecord {
    fn new(run: &RunConfig, status: &str) -> Self {
        Self {
            model:   run.model.clone(),
            dataset: run.dataset.clone(),
            config:  run.config.clone(),
            label:   run.label_column.clone(),
            status:  status.to_string(),
            metric:  String::new(),
            score:   None,
        }
    }
}

// ─── SweepUseCase ─────────────────────────────────────────────────────────────
pub struct SweepUseCase<'a> {
    config:   SweepConfig,
    registry: &'a DatasetRegistry,
    fetcher:  &'a Fetcher,
}

impl<'a> SweepUseCase<'a> {
    pub fn new(config: SweepConfig, registry: &'a DatasetRegistry, fetcher: &'a Fetcher) -> Self {
        Self { config, registry, fetcher }
    }

    /// Run every planned pair sequentially. Returns one record per pair.
    pub fn execute(&self) -> Result<Vec<SweepRecord>> {
        let plan = self.config.plan();
        tracing::info!("Sweep: {} runs under {}", plan.len(), self.config.output_root.display());

        let mut summary = SummaryWriter::create(&self.config.output_root)?;
        let mut records = Vec::with_capacity(plan.len());

        for (i, run) in plan.into_iter().enumerate() {
            tracing::info!(
                "── Run {}: {} on {}/{} ({}) ──",
                i + 1, run.model, run.dataset, run.config, run.label_column,
            );
            let record = match TrainUseCase::new(run.clone(), self.registry, self.fetcher).execute() {
                Ok(outcome) => {
                    let mut record = SweepRecord::new(&run, "ok");
                    let metric = self.registry.descriptor(&run.dataset, &run.config)?.metric;
                    record.metric = headline_key(metric).to_string();
                    record.score  = outcome
                        .test
                        .and_then(|scores| scores.get(headline_key(metric)).copied());
                    record
                }
                Err(e) => {
                    tracing::warn!("{} on {}/{} failed: {:#}", run.model, run.dataset, run.config, e);
                    SweepRecord::new(&run, "failed")
                }
            };
            summary.write(&record)?;
            records.push(record);
        }

        let failed = records.iter().filter(|r| r.status == "failed").count();
        tracing::info!("Sweep finished: {} ok, {} failed", records.len() - failed, failed);
        Ok(records)
    }
}

struct SummaryWriter {
    writer: csv::Writer<fs::File>,
}

impl SummaryWriter {
    fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Cannot create sweep directory {}", root.display()))?;
        let path   = root.join(SUMMARY_FILE);
        let writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        Ok(Self { writer })
    }

    fn write(&mut self, record: &SweepRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_full_plan_is_models_times_tasks() {
        let plan = SweepConfig::new("runs").plan();
        assert_eq!(plan.len(), MODELS.len() * TASKS.len());
        assert_eq!(plan[0].model, "SzegedAI/hubert-tiny-wiki-seq128");
        assert_eq!(plan[0].dataset, "hulu");
        assert_eq!(plan[TASKS.len()].model, "SzegedAI/hubert-tiny-wiki");
    }

    #[test]
    fn test_every_task_is_registered() {
        let registry = DatasetRegistry::standard();
        for (dataset, config, _) in TASKS {
            assert!(registry.descriptor(dataset, config).is_ok(), "{dataset}/{config}");
        }
    }

    #[test]
    fn test_filters_narrow_plan() {
        let mut cfg = SweepConfig::new("runs");
        cfg.model_filter   = Some("xlm-roberta".into());
        cfg.dataset_filter = Some("opinhubank".into());
        let plan = cfg.plan();
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|r| r.label_column == "label"));
        assert_eq!(plan[0].output_dir, PathBuf::from("runs/xlm-roberta-base/opinhubank-opinhubank-label"));
    }

    #[test]
    fn test_plan_carries_sweep_settings() {
        let mut cfg = SweepConfig::new("out");
        cfg.max_length = 128;
        cfg.save_model = true;
        cfg.training.epochs = 1;
        let run = &cfg.plan()[0];
        assert_eq!(run.max_length, 128);
        assert!(run.save_model);
        assert_eq!(run.training.epochs, 1);
    }

    #[test]
    fn test_summary_rows_written_per_record() {
        let dir = tempdir().unwrap();
        let run = RunConfig::new("m", "hulu", "rc", "labels");
        let mut writer = SummaryWriter::create(dir.path()).unwrap();
        writer.write(&SweepRecord::new(&run, "failed")).unwrap();
        let mut ok = SweepRecord::new(&run, "ok");
        ok.metric = "accuracy".into();
        ok.score  = Some(0.5);
        writer.write(&ok).unwrap();

        let text = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model,dataset,config,label,status,metric,score");
        assert_eq!(lines[1], "m,hulu,rc,labels,failed,,");
        assert_eq!(lines[2], "m,hulu,rc,labels,ok,accuracy,0.5");
    }
}
