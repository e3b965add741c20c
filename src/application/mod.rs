// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (inspect corpora, run one benchmark, run all
// of them).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct corpus or network access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Run state machine: configured → trained → evaluated
pub mod training;

// One model on one task
pub mod train_use_case;

// Every model on every task
pub mod sweep_use_case;

// Listing and preparing corpora
pub mod catalog_use_case;
