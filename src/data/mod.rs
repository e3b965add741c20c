// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a registry lookup to GPU-ready tensor batches.
//
//   DatasetRegistry   → (dataset, config) → builder + descriptor
//       │
//       ▼
//   CorpusBuilder     → download, then parse three splits
//       │               (hulu, nerkor, nerkor_extended, opinhubank)
//       ▼
//   Corpus            → rows + label vocabularies
//       │
//       ▼
//   Aligner           → tokenised Examples with aligned labels
//       │
//       ▼
//   ExampleDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   TaskBatcher       → stacks Examples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Builder trait shared by every corpus family
pub mod builder;

/// Maps (dataset, configuration) to builders and descriptors
pub mod registry;

/// Hungarian Language Understanding benchmark (6 configurations)
pub mod hulu;

/// Blank-line separated token files
pub mod conll;

/// NYTK-NerKor named entities and POS tags
pub mod nerkor;

/// NerKor 1.41e with OntoNotes++ entity types
pub mod nerkor_extended;

/// OpinHuBank entity-level sentiment
pub mod opinhubank;

/// Seeded 80/(0.7·n)/20 re-splitting
pub mod splitter;

/// Rows → tokenised Examples, one aligner per task type
pub mod aligner;

/// Implements Burn's Dataset trait for aligned examples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
