// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes any TaskHead with Burn's DataLoader and Adam, then
// scores it on a held-out split.
//
//   for epoch in 1..=epochs:
//       for batch in shuffled train loader:
//           loss / accumulation_steps → backward → accumulate
//           every accumulation_steps batches: Adam step
//       model.valid() → evaluate on validation split → log row
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the head on B::InnerBackend, so the
//     evaluation batcher is built for the inner backend too
//   - argmax(1) returns [rows, 1]; flatten before reading values
//
// The learning rate decays linearly to zero over all optimiser
// steps. No intermediate checkpoints are written.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::TaskBatcher,
    dataset::{Example, ExampleDataset},
};
use crate::domain::labels::ClassLabel;
use crate::domain::task::MetricId;
use crate::error::{HuevalError, Result};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::heads::TaskHead;
use crate::ml::scoring::{self, Scores};

/// Optimisation hyperparameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArgs {
    pub train_batch_size:  usize,
    pub eval_batch_size:   usize,
    pub accumulation:      usize,
    pub learning_rate:     f64,
    pub epochs:            usize,
    /// Shuffles the training loader
    pub data_seed:         u64,
    /// Seeds the backend RNG (weight init, dropout)
    pub seed:              u64,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            train_batch_size: 8,
            eval_batch_size:  8,
            accumulation:     4,
            learning_rate:    5e-5,
            epochs:           3,
            data_seed:        0,
            seed:             0,
        }
    }
}

impl TrainingArgs {
    /// Optimiser steps over the whole run, counting the partial
    /// accumulation window flushed at the end of every epoch.
    pub fn total_steps(&self, train_len: usize) -> usize {
        let batches = train_len.div_ceil(self.train_batch_size.max(1));
        batches.div_ceil(self.accumulation.max(1)) * self.epochs
    }
}

/// Loss and metric values of one pass over a split.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss:   f64,
    pub scores: Scores,
}

/// Turns a head's logits into per-example predictions and scores them.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pub metric:      MetricId,
    pub label_names: ClassLabel,
    pub batch_size:  usize,
}

impl Evaluator {
    pub fn evaluate<B, M>(&self, model: &M, dataset: ExampleDataset, device: &B::Device) -> Result<Evaluation>
    where
        B: Backend,
        M: TaskHead<B>,
    {
        let loader = DataLoaderBuilder::new(TaskBatcher::<B>::new(device.clone()))
            .batch_size(self.batch_size.max(1))
            .num_workers(1)
            .build(dataset);

        let mut loss_sum    = 0.0f64;
        let mut batches     = 0usize;
        let mut predictions = Vec::new();
        let mut references  = Vec::new();

        for batch in loader.iter() {
            let batch_size = batch.batch_size();
            let output     = model.forward_batch(batch);

            loss_sum += output.loss.into_scalar().elem::<f64>();
            batches  += 1;

            let predicted = int_values(output.logits.argmax(1).flatten::<1>(0, 1))?;
            let gold      = int_values(output.targets)?;
            let (pred, gold) = per_example(predicted, gold, batch_size);
            predictions.extend(pred);
            references.extend(gold);
        }

        let loss   = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let scores = scoring::score(self.metric, &predictions, &references, &self.label_names)?;
        Ok(Evaluation { loss, scores })
    }
}

fn int_values<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| HuevalError::Metric(format!("{e:?}")))
}

/// Split a batch's flat rows into one (prediction, gold) group per
/// example, dropping positions whose gold label is negative.
pub fn per_example(predicted: Vec<i64>, gold: Vec<i64>, batch_size: usize) -> (Vec<Vec<i64>>, Vec<Vec<i64>>) {
    let rows_per_example = (gold.len() / batch_size.max(1)).max(1);
    predicted
        .chunks(rows_per_example)
        .zip(gold.chunks(rows_per_example))
        .map(|(p, g)| {
            let mut pred = Vec::new();
            let mut gold = Vec::new();
            for (&p, &g) in p.iter().zip(g) {
                if g >= 0 {
                    pred.push(p);
                    gold.push(g);
                }
            }
            (pred, gold)
        })
        .unzip()
}

/// Run the full fine-tuning loop and return the trained head.
pub fn fit<B, M>(
    mut model: M,
    args:      &TrainingArgs,
    train:     Vec<Example>,
    valid:     Vec<Example>,
    evaluator: &Evaluator,
    logger:    Option<&MetricsLogger>,
    device:    &B::Device,
) -> Result<M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + TaskHead<B>,
    M::InnerModule: TaskHead<B::InnerBackend>,
{
    if train.is_empty() {
        return Err(HuevalError::Training("training split is empty".into()));
    }
    // dropout masks
    B::seed(args.seed);

    let accumulation = args.accumulation.max(1);
    let total_steps  = args.total_steps(train.len());
    let mut step     = 0usize;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TaskBatcher::<B>::new(device.clone()))
        .batch_size(args.train_batch_size.max(1))
        .shuffle(args.data_seed)
        .num_workers(1)
        .build(ExampleDataset::new(train));

    tracing::info!(
        "Training for {} epochs, {} optimiser steps (batch {} × accumulation {})",
        args.epochs, total_steps, args.train_batch_size, accumulation,
    );

    for epoch in 1..=args.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut accumulator    = GradientsAccumulator::<M>::new();
        let mut pending        = 0usize;

        for batch in train_loader.iter() {
            let loss = model.forward_batch(batch).loss;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(HuevalError::Training(format!(
                    "non-finite loss at epoch {epoch}, batch {}", train_batches + 1
                )));
            }
            train_loss_sum += loss_val;
            train_batches  += 1;

            let grads = (loss / accumulation as f64).backward();
            accumulator.accumulate(&model, GradientsParams::from_grads(grads, &model));
            pending += 1;

            if pending == accumulation {
                model   = optim.step(learning_rate(args, step, total_steps), model, accumulator.grads());
                step   += 1;
                pending = 0;
            }
        }
        if pending > 0 {
            model = optim.step(learning_rate(args, step, total_steps), model, accumulator.grads());
            step += 1;
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // dropout disabled for deterministic evaluation
        let model_valid = model.valid();
        let validation  = evaluator.evaluate::<B::InnerBackend, _>(
            &model_valid,
            ExampleDataset::new(valid.clone()),
            device,
        )?;

        let headline = validation
            .scores
            .get(scoring::headline_key(evaluator.metric))
            .copied()
            .unwrap_or(f64::NAN);
        tracing::info!(
            "Epoch {:>2}/{} | train_loss={:.4} | val_loss={:.4} | {}={:.4}",
            epoch, args.epochs, avg_train_loss, validation.loss,
            scoring::headline_key(evaluator.metric), headline,
        );

        if let Some(logger) = logger {
            logger.log(&EpochMetrics::new(epoch, avg_train_loss, validation.loss, validation.scores))?;
        }
    }

    tracing::info!("Training complete after {} optimiser steps", step);
    Ok(model)
}

/// Linear decay from the configured rate to zero.
fn learning_rate(args: &TrainingArgs, step: usize, total_steps: usize) -> f64 {
    let remaining = 1.0 - step as f64 / total_steps.max(1) as f64;
    args.learning_rate * remaining.max(0.0)
}
