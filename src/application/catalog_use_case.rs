// ============================================================
// Layer 2 — CatalogUseCase
// ============================================================
// What the registry offers, and getting a corpus onto disk
// ahead of a run:
//
//   entries() — every registered (dataset, config) descriptor
//   prepare() — download, parse all three splits, report sizes

use anyhow::{Context, Result};

use crate::data::registry::DatasetRegistry;
use crate::domain::{
    corpus::Split,
    task::TaskDescriptor,
};
use crate::infra::download::Fetcher;

/// Split sizes of a prepared corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    pub descriptor: TaskDescriptor,
    pub train:      usize,
    pub validation: usize,
    pub test:       usize,
    /// False when the test split ships only placeholder labels
    pub test_has_gold: bool,
}

pub struct CatalogUseCase<'a> {
    registry: &'a DatasetRegistry,
}

impl<'a> CatalogUseCase<'a> {
    pub fn new(registry: &'a DatasetRegistry) -> Self {
        Self { registry }
    }

    /// Descriptors, optionally restricted to one dataset.
    pub fn entries(&self, dataset: Option<&str>) -> Result<Vec<TaskDescriptor>> {
        if let Some(name) = dataset {
            // unknown names fail here rather than listing nothing
            self.registry.available_configs(name)?;
        }
        Ok(self
            .registry
            .descriptors()
            .filter(|d| dataset.map_or(true, |name| d.dataset == name))
            .copied()
            .collect())
    }

    /// Download and parse one configuration; `label_column` decides
    /// whether the test split counts as annotated.
    pub fn prepare(
        &self,
        fetcher:      &Fetcher,
        dataset:      &str,
        config:       &str,
        label_column: &str,
    ) -> Result<CorpusSummary> {
        let corpus = self
            .registry
            .load_dataset(dataset, config, fetcher)
            .with_context(|| format!("Cannot prepare {}/{}", dataset, config))?;

        let summary = CorpusSummary {
            descriptor:    corpus.descriptor,
            train:         corpus.split(Split::Train).len(),
            validation:    corpus.split(Split::Validation).len(),
            test:          corpus.split(Split::Test).len(),
            test_has_gold: corpus.test.has_gold_labels(label_column),
        };
        tracing::info!(
            "Prepared {}: {} train / {} validation / {} test",
            summary.descriptor, summary.train, summary.validation, summary.test,
        );
        Ok(summary)
    }
}
