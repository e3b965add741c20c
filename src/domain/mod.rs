// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that describe what the harness works with:
// corpus rows, splits, label vocabularies, task descriptors and
// the tokenizer abstraction the aligners are written against.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//   - Only plain structs, enums, and traits

/// Rows yielded by corpus builders
pub mod row;

/// Ordered class-name vocabularies per label column
pub mod labels;

/// Three-split corpora
pub mod corpus;

/// Task types, metrics, descriptors
pub mod task;

/// Core abstractions that other layers implement
pub mod traits;
