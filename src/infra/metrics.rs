// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-epoch training metrics to a CSV file.
//
// Columns are fixed per run: the losses, then every score the
// registered metric produces (see scoring::score_columns).
//
// Output file: <output>/metrics.csv
//
// Example CSV output (sst2, accuracy):
//   epoch,train_loss,val_loss,accuracy
//   1,1.024500,0.989200,0.523000
//   2,0.890100,0.854300,0.584000
//
// A final `test` row is appended after evaluation with the
// held-out scores and an empty train_loss.
//
// A run owns its log: creating a logger truncates any metrics.csv
// left in the directory by an earlier run.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::task::MetricId;
use crate::error::Result;
use crate::ml::scoring::{score_columns, Scores};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average loss over all training batches
    pub train_loss: f64,

    /// Average loss on the validation set
    pub val_loss: f64,

    /// Validation scores keyed by metric name
    pub scores: Scores,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, scores: Scores) -> Self {
        Self { epoch, train_loss, val_loss, scores }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
    columns:  &'static [&'static str],
}

impl MetricsLogger {
    /// Create the logger, replacing any earlier file with a fresh header.
    pub fn new(dir: &Path, metric: MetricId) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let columns  = score_columns(metric);

        if csv_path.exists() {
            tracing::info!("Replacing metrics of an earlier run: '{}'", csv_path.display());
        }
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "epoch,train_loss,val_loss,{}", columns.join(","))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path, columns })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        self.append(&m.epoch.to_string(), &format!("{:.6}", m.train_loss), m.val_loss, &m.scores)?;
        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch, m.train_loss, m.val_loss,
        );
        Ok(())
    }

    /// Append the held-out evaluation as a `test` row.
    pub fn log_test(&self, loss: f64, scores: &Scores) -> Result<()> {
        self.append("test", "", loss, scores)
    }

    fn append(&self, epoch: &str, train_loss: &str, val_loss: f64, scores: &Scores) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let values: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{:.6}", scores.get(*c).copied().unwrap_or(f64::NAN)))
            .collect();
        writeln!(f, "{epoch},{train_loss},{val_loss:.6},{}", values.join(","))?;
        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> Scores {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_header_follows_metric() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), MetricId::Seqeval).unwrap();
        let text   = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "epoch,train_loss,val_loss,overall_precision,overall_recall,overall_f1,overall_accuracy"
        );
    }

    #[test]
    fn test_rows_append() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), MetricId::Accuracy).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.25, scores(&[("accuracy", 0.75)]))).unwrap();
        logger.log_test(0.3, &scores(&[("accuracy", 0.8)])).unwrap();

        let text: Vec<String> = fs::read_to_string(logger.csv_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(text[1], "1,0.500000,0.250000,0.750000");
        assert_eq!(text[2], "test,,0.300000,0.800000");
    }

    #[test]
    fn test_rerun_replaces_earlier_rows() {
        let dir   = tempfile::tempdir().unwrap();
        let first = MetricsLogger::new(dir.path(), MetricId::Accuracy).unwrap();
        first.log(&EpochMetrics::new(1, 0.9, 0.8, scores(&[("accuracy", 0.4)]))).unwrap();
        first.log_test(0.7, &scores(&[("accuracy", 0.5)])).unwrap();

        let second = MetricsLogger::new(dir.path(), MetricId::Accuracy).unwrap();
        second.log(&EpochMetrics::new(1, 0.5, 0.25, scores(&[("accuracy", 0.75)]))).unwrap();

        let text = fs::read_to_string(second.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "epoch,train_loss,val_loss,accuracy",
            "1,0.500000,0.250000,0.750000",
        ]);
    }
}
