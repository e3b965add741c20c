// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Some corpora (HuWS, OpinHuBank) ship as one file with no
// native split. They are re-split deterministically:
//
//   all rows ──shuffle(seed)──► 80% train  |  20% test
//   80% train ──shuffle(seed)──► floor(0.7 · all) train | rest validation
//
// The seed is fixed at 0 so every run sees the same partitions.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom driven by
// a seeded StdRng instead of thread_rng.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed used by every builder that re-splits a corpus.
pub const SPLIT_SEED: u64 = 0;

/// Fraction of all rows kept for train + validation.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Fraction of all rows that ends up in the final train split.
pub const FINAL_TRAIN_FRACTION: f64 = 0.7;

/// Result of the three-way re-split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeWaySplit<T> {
    pub train:      Vec<T>,
    pub validation: Vec<T>,
    pub test:       Vec<T>,
}

/// Shuffle `samples` with `seed`, keep the first `keep` rows and hold out the rest.
///
/// # Returns
/// A tuple (kept, held_out)
pub fn split_off_shuffled<T>(mut samples: Vec<T>, keep: usize, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    // Clamp to valid range to avoid panics on tiny datasets
    let split_at = keep.min(samples.len());
    let held_out = samples.split_off(split_at);
    (samples, held_out)
}

/// Shuffle and split into (train, test), `train_fraction` of rows going to train.
/// The test side receives `ceil((1 - train_fraction) · n)` rows.
pub fn split_train_test<T>(samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let total      = samples.len();
    let test_count = ((total as f64) * (1.0 - train_fraction)).ceil() as usize;
    split_off_shuffled(samples, total.saturating_sub(test_count), seed)
}

/// The 80 / (0.7 × all) / 20 re-split used for corpora without native splits.
pub fn split_three_way<T>(samples: Vec<T>, seed: u64) -> ThreeWaySplit<T> {
    let total = samples.len();
    let (train, test) = split_train_test(samples, TRAIN_FRACTION, seed);

    let final_train = ((total as f64) * FINAL_TRAIN_FRACTION).floor() as usize;
    let (train, validation) = split_off_shuffled(train, final_train, seed);

    tracing::debug!(
        "Re-split {} rows: {} train, {} validation, {} test",
        total,
        train.len(),
        validation.len(),
        test.len(),
    );

    ThreeWaySplit { train, validation, test }
}
