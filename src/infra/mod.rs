// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the network or the disk outside the
// corpus parsers:
//
//   download.rs        — HTTP(S) cache for corpora and archives
//   checkpoint.rs      — model identifier → checkpoint directory,
//                        encoder records, run_config.json
//   tokenizer_store.rs — tokenizers::Tokenizer as a TextEncoder
//   metrics.rs         — per-epoch metrics CSV
//
// Reference: Burn Book §5 (Checkpointing)

/// Cached downloads and archive extraction
pub mod download;

/// Checkpoint resolution and model records
pub mod checkpoint;

/// Fixed-length sub-word encoding
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
