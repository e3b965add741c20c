// ============================================================
// hueval — Hungarian language-model benchmark harness
// ============================================================
// Layer 1  cli          argument parsing, printing
// Layer 2  application  run state machine, single runs, sweeps
// Layer 3  domain       tasks, labels, rows, corpora, traits
// Layer 4  data         corpus builders, registry, aligners, batching
// Layer 5  ml           encoder, heads, training loop, metrics
// Layer 6  infra        downloads, checkpoints, tokenizers, CSV logs
//
// Typed errors for layers 3-6 live in `error`.

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
pub mod error;
