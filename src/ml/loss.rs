// ============================================================
// Layer 5 — Masked Cross-Entropy
// ============================================================
// Cross-entropy over rows of logits where some targets must not
// count: sub-token continuations and special tokens (-100) and
// unknown gold labels (-1). Any negative target is skipped.
//
//   loss = − Σ_valid log softmax(logits_i)[t_i]  /  max(#valid, 1)
//
// Burn's CrossEntropyLoss only masks by pad token id, so the
// mask is applied by hand here.

use burn::{prelude::*, tensor::activation::log_softmax};

/// logits: [rows, classes], targets: [rows] → scalar loss [1]
pub fn masked_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [rows, _] = logits.dims();

    let valid   = targets.clone().greater_equal_elem(0).float();
    let indices = targets.clamp_min(0).reshape([rows, 1]);

    let picked = log_softmax(logits, 1).gather(1, indices).reshape([rows]);
    let count  = valid.clone().sum().clamp_min(1.0);

    (picked * valid).sum().neg() / count
}
