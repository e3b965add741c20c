// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here; the data layer only touches
// Burn's Dataset and Batcher traits.
//
//   model.rs    — BERT-style encoder built from config.json
//   heads.rs    — sequence / token / multiple-choice / span heads
//   loss.rs     — cross-entropy that skips negative targets
//   adapter.rs  — model identifier + corpus → head + tokenizer
//   trainer.rs  — fine-tuning loop, evaluation, predictions
//   scoring.rs  — accuracy, MCC, seqeval, ReCoRD
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Transformer encoder architecture
pub mod model;

/// Task-specific output heads
pub mod heads;

/// Masked cross-entropy
pub mod loss;

/// One adapter per task type
pub mod adapter;

/// Training loop with per-epoch validation
pub mod trainer;

/// Metric computation
pub mod scoring;
