// ============================================================
// Layer 4 — Task Batcher
// ============================================================
// Implements Burn's Batcher trait to stack aligned Examples into
// tensors for one forward pass.
//
// Every example is already padded to the encoder's max length S.
// Multiple-choice examples hold C encodings each; they are laid
// out choice-major inside their example:
//
//   ex0.c0, ex0.c1, ex1.c0, ex1.c1, ...   → [N · C, S]
//
// Labels:
//   Class label       → [N, 1]
//   Per-token labels  → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::Example;
use crate::domain::traits::Encoded;

// ─── TaskBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TaskBatch<B: Backend> {
    /// Token IDs — shape: [batch_size · num_choices, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — same shape as input_ids
    pub attention_mask: Tensor<B, 2, Int>,

    /// Segment ids — same shape as input_ids
    pub type_ids: Tensor<B, 2, Int>,

    /// Gold labels — shape: [batch_size, 1] or [batch_size, seq_len]
    pub labels: Tensor<B, 2, Int>,

    /// Encodings per example; 1 outside multiple choice
    pub num_choices: usize,
}

impl<B: Backend> TaskBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct TaskBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TaskBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Example, TaskBatch<B>> for TaskBatcher<B> {
    fn batch(&self, items: Vec<Example>) -> TaskBatch<B> {
        let batch_size  = items.len();
        let num_choices = items.first().map(Example::num_choices).unwrap_or(1).max(1);
        let seq_len     = items.first().map(Example::seq_len).unwrap_or(0);

        let ids_flat   = flatten(&items, |e| e.input_ids.as_slice());
        let mask_flat  = flatten(&items, |e| e.attention_mask.as_slice());
        let types_flat = flatten(&items, |e| e.type_ids.as_slice());

        let label_rows: Vec<Vec<i64>> = items.iter().map(|e| e.label.values()).collect();
        let label_len = label_rows.first().map(Vec::len).unwrap_or(1);
        let labels_flat: Vec<i32> = label_rows
            .iter()
            .flat_map(|row| row.iter().map(|&l| l as i32))
            .collect();

        let rows = batch_size * num_choices;

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            ids_flat.as_slice(), &self.device
        ).reshape([rows, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([rows, seq_len]);

        let type_ids = Tensor::<B, 1, Int>::from_ints(
            types_flat.as_slice(), &self.device
        ).reshape([rows, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(
            labels_flat.as_slice(), &self.device
        ).reshape([batch_size, label_len]);

        TaskBatch {
            input_ids,
            attention_mask,
            type_ids,
            labels,
            num_choices,
        }
    }
}

/// Concatenate one field of every encoding, example by example.
fn flatten(items: &[Example], field: impl Fn(&Encoded) -> &[u32]) -> Vec<i32> {
    items
        .iter()
        .flat_map(|e| e.inputs.iter())
        .flat_map(|enc| field(enc).iter().map(|&x| x as i32))
        .collect()
}
