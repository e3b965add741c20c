// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `datasets` — list registered benchmark configurations
//   2. `prepare`  — download and parse one corpus
//   3. `train`    — fine-tune and score one model on one task
//   4. `sweep`    — every benchmark model on every task
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DatasetsArgs, PrepareArgs, SweepArgs, TrainArgs};
use std::path::PathBuf;

use crate::data::registry::DatasetRegistry;
use crate::infra::download::{Fetcher, CACHE_ENV};

#[derive(Parser, Debug)]
#[command(
    name = "hueval",
    version = "0.1.0",
    about = "Fine-tune and score language models on Hungarian NLP benchmarks."
)]
pub struct Cli {
    /// Cache directory for corpora and checkpoints
    #[arg(long, global = true, env = CACHE_ENV)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Build the registry once and route to the matching use case.
    pub fn run(self) -> Result<()> {
        let registry  = DatasetRegistry::standard();
        let cache_dir = self.cache_dir;
        match self.command {
            Commands::Datasets(args) => run_datasets(&registry, &args),
            Commands::Prepare(args)  => run_prepare(&registry, &open_cache(cache_dir)?, &args),
            Commands::Train(args)    => run_train(&registry, &open_cache(cache_dir)?, args),
            Commands::Sweep(args)    => run_sweep(&registry, &args, || open_cache(cache_dir)),
        }
    }
}

fn open_cache(cache_dir: Option<PathBuf>) -> Result<Fetcher> {
    let fetcher = match cache_dir {
        Some(dir) => Fetcher::with_cache_dir(dir)?,
        None      => Fetcher::new()?,
    };
    tracing::info!("Cache directory: {}", fetcher.cache_dir().display());
    Ok(fetcher)
}

fn run_datasets(registry: &DatasetRegistry, args: &DatasetsArgs) -> Result<()> {
    use crate::application::catalog_use_case::CatalogUseCase;

    let entries = CatalogUseCase::new(registry).entries(args.dataset.as_deref())?;
    println!("{:<14} {:<12} {:<26} {}", "DATASET", "CONFIG", "TASK", "METRIC");
    for d in entries {
        println!("{:<14} {:<12} {:<26} {}", d.dataset, d.config, d.task_type, d.metric);
    }
    Ok(())
}

fn run_prepare(registry: &DatasetRegistry, fetcher: &Fetcher, args: &PrepareArgs) -> Result<()> {
    use crate::application::catalog_use_case::CatalogUseCase;

    let summary = CatalogUseCase::new(registry).prepare(
        fetcher,
        &args.dataset,
        &args.config,
        &args.label_column,
    )?;
    println!("{}", summary.descriptor);
    println!("  train:      {}", summary.train);
    println!("  validation: {}", summary.validation);
    println!(
        "  test:       {}{}",
        summary.test,
        if summary.test_has_gold { "" } else { " (unlabelled)" },
    );
    Ok(())
}

fn run_train(registry: &DatasetRegistry, fetcher: &Fetcher, args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let outcome = TrainUseCase::new(args.into(), registry, fetcher).execute()?;
    println!("Run directory: {}", outcome.output_dir.display());
    match outcome.test {
        Some(scores) => {
            for (name, value) in scores {
                println!("  {:<22} {:.4}", name, value);
            }
        }
        None => println!("Test split has no gold labels; see metrics.csv for validation scores."),
    }
    Ok(())
}

fn run_sweep(
    registry: &DatasetRegistry,
    args:     &SweepArgs,
    fetcher:  impl FnOnce() -> Result<Fetcher>,
) -> Result<()> {
    use crate::application::sweep_use_case::{SweepConfig, SweepUseCase};

    let config = SweepConfig::from(args);
    if args.dry_run {
        for run in config.plan() {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                run.model, run.dataset, run.config, run.label_column, run.output_dir.display(),
            );
        }
        return Ok(());
    }

    let fetcher = fetcher()?;
    let records = SweepUseCase::new(config, registry, &fetcher).execute()?;
    for r in records {
        let score = r.score.map_or_else(|| "-".to_string(), |s| format!("{:.4}", s));
        println!("{:<38} {:<14} {:<10} {:<6} {:<7} {}", r.model, r.dataset, r.config, r.label, r.status, score);
    }
    Ok(())
}
