// ============================================================
// Layer 5 — Task Heads
// ============================================================
// One head per task type, each wrapping the shared Encoder:
//
//   SequenceClassifier   pooled [CLS] → Linear(hidden, labels)
//   TokenClassifier      every position → Linear(hidden, labels)
//   MultipleChoiceModel  pooled [CLS] per choice → Linear(hidden, 1)
//                        → scores regrouped to [batch, choices]
//   SpanExtractor        every position → Linear(hidden, 2)
//                        → start / end logits over positions
//
// Every head reduces a TaskBatch to the same HeadOutput shape so
// the trainer never needs to know which head it is driving:
//
//   logits  [rows, classes]   arg-max gives the prediction
//   targets [rows]            gold index, negative = not scored
//
// Reference: Devlin et al. (2019) BERT §4 (fine-tuning heads)

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::batcher::TaskBatch;
use crate::ml::loss::masked_cross_entropy;
use crate::ml::model::{Encoder, EncoderConfig};

pub struct HeadOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub logits:  Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
}

/// Forward pass plus loss for one batch.
pub trait TaskHead<B: Backend> {
    fn forward_batch(&self, batch: TaskBatch<B>) -> HeadOutput<B>;
}

// ─── Sequence classification ──────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SequenceClassifier<B: Backend> {
    pub encoder:    Encoder<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> SequenceClassifier<B> {
    pub fn new(config: &EncoderConfig, num_labels: usize, device: &B::Device) -> Self {
        Self {
            encoder:    config.init(device),
            dropout:    DropoutConfig::new(config.dropout).init(),
            classifier: LinearConfig::new(config.hidden_size, num_labels).init(device),
        }
    }
}

impl<B: Backend> TaskHead<B> for SequenceClassifier<B> {
    fn forward_batch(&self, batch: TaskBatch<B>) -> HeadOutput<B> {
        let batch_size = batch.batch_size();
        let hidden = self.encoder.forward(batch.input_ids, batch.attention_mask, batch.type_ids);
        let pooled = self.dropout.forward(self.encoder.pool(hidden));

        let logits  = self.classifier.forward(pooled);
        let targets = batch.labels.reshape([batch_size]);
        let loss    = masked_cross_entropy(logits.clone(), targets.clone());
        HeadOutput { loss, logits, targets }
    }
}

// ─── Token classification ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TokenClassifier<B: Backend> {
    pub encoder:    Encoder<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> TokenClassifier<B> {
    pub fn new(config: &EncoderConfig, num_labels: usize, device: &B::Device) -> Self {
        Self {
            encoder:    config.init(device),
            dropout:    DropoutConfig::new(config.dropout).init(),
            classifier: LinearConfig::new(config.hidden_size, num_labels).init(device),
        }
    }
}

impl<B: Backend> TaskHead<B> for TokenClassifier<B> {
    fn forward_batch(&self, batch: TaskBatch<B>) -> HeadOutput<B> {
        let [batch_size, seq_len] = batch.input_ids.dims();
        let hidden = self.encoder.forward(batch.input_ids, batch.attention_mask, batch.type_ids);

        // [batch, seq_len, labels] → one row per position
        let logits = self.classifier.forward(self.dropout.forward(hidden));
        let [_, _, num_labels] = logits.dims();
        let logits  = logits.reshape([batch_size * seq_len, num_labels]);
        let targets = batch.labels.reshape([batch_size * seq_len]);

        let loss = masked_cross_entropy(logits.clone(), targets.clone());
        HeadOutput { loss, logits, targets }
    }
}

// ─── Multiple choice ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultipleChoiceModel<B: Backend> {
    pub encoder: Encoder<B>,
    pub dropout: Dropout,
    pub scorer:  Linear<B>,
}

impl<B: Backend> MultipleChoiceModel<B> {
    pub fn new(config: &EncoderConfig, device: &B::Device) -> Self {
        Self {
            encoder: config.init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            scorer:  LinearConfig::new(config.hidden_size, 1).init(device),
        }
    }
}

impl<B: Backend> TaskHead<B> for MultipleChoiceModel<B> {
    fn forward_batch(&self, batch: TaskBatch<B>) -> HeadOutput<B> {
        let batch_size  = batch.batch_size();
        let num_choices = batch.num_choices;

        // input rows are [ex0.c0, ex0.c1, ex1.c0, ...]
        let hidden = self.encoder.forward(batch.input_ids, batch.attention_mask, batch.type_ids);
        let pooled = self.dropout.forward(self.encoder.pool(hidden));
        let logits = self.scorer.forward(pooled).reshape([batch_size, num_choices]);

        let targets = batch.labels.reshape([batch_size]);
        let loss    = masked_cross_entropy(logits.clone(), targets.clone());
        HeadOutput { loss, logits, targets }
    }
}

// ─── Span extraction ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SpanExtractor<B: Backend> {
    pub encoder: Encoder<B>,
    pub qa_head: Linear<B>,
}

impl<B: Backend> SpanExtractor<B> {
    pub fn new(config: &EncoderConfig, device: &B::Device) -> Self {
        Self {
            encoder: config.init(device),
            qa_head: LinearConfig::new(config.hidden_size, 2).init(device),
        }
    }
}

impl<B: Backend> TaskHead<B> for SpanExtractor<B> {
    /// labels: [batch, 2] holding (start, end) token positions.
    /// Output rows are all start distributions, then all end distributions.
    fn forward_batch(&self, batch: TaskBatch<B>) -> HeadOutput<B> {
        let [batch_size, seq_len] = batch.input_ids.dims();
        let hidden = self.encoder.forward(batch.input_ids, batch.attention_mask, batch.type_ids);

        // Project to 2 logits per token then split into start / end.
        let logits = self.qa_head.forward(hidden); // [batch, seq_len, 2]
        let start_logits = logits.clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        let start_targets = batch.labels.clone().slice([0..batch_size, 0..1]).reshape([batch_size]);
        let end_targets   = batch.labels.slice([0..batch_size, 1..2]).reshape([batch_size]);

        // Loss = (CE_start + CE_end) / 2
        let loss = (masked_cross_entropy(start_logits.clone(), start_targets.clone())
                  + masked_cross_entropy(end_logits.clone(), end_targets.clone())) / 2.0_f64;

        HeadOutput {
            loss,
            logits:  Tensor::cat(vec![start_logits, end_logits], 0),
            targets: Tensor::cat(vec![start_targets, end_targets], 0),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::TaskBatcher;
    use crate::data::dataset::{Example, ExampleLabel};
    use crate::domain::traits::Encoded;
    use crate::ml::model::tests::{rng_guard, tiny_config, B};
    use burn::data::dataloader::batcher::Batcher;

    fn encoded(ids: [u32; 6]) -> Encoded {
        let real = ids.iter().filter(|&&i| i != 0).count();
        let mut attention_mask = vec![1; real];
        attention_mask.resize(6, 0);
        Encoded {
            input_ids: ids.to_vec(),
            attention_mask,
            type_ids:  vec![0; 6],
            word_ids:  vec![None; 6],
        }
    }

    fn batch(items: Vec<Example>) -> TaskBatch<B> {
        TaskBatcher::<B>::new(Default::default()).batch(items)
    }

    #[test]
    fn test_sequence_head_shapes() {
        let _rng  = rng_guard();
        let model = SequenceClassifier::<B>::new(&tiny_config(), 3, &Default::default());
        let out = model.forward_batch(batch(vec![
            Example { idx: 0, inputs: vec![encoded([1, 5, 2, 0, 0, 0])], label: ExampleLabel::Class(2) },
            Example { idx: 1, inputs: vec![encoded([1, 6, 7, 2, 0, 0])], label: ExampleLabel::Class(0) },
        ]));
        assert_eq!(out.logits.dims(), [2, 3]);
        assert_eq!(out.targets.dims(), [2]);
        assert!(out.loss.into_scalar().elem::<f64>().is_finite());
    }

    #[test]
    fn test_token_head_flattens_positions() {
        let _rng  = rng_guard();
        let model = TokenClassifier::<B>::new(&tiny_config(), 9, &Default::default());
        let out = model.forward_batch(batch(vec![Example {
            idx:    0,
            inputs: vec![encoded([1, 5, 6, 2, 0, 0])],
            label:  ExampleLabel::Sequence(vec![-100, 1, 2, -100, -100, -100]),
        }]));
        assert_eq!(out.logits.dims(), [6, 9]);
        assert_eq!(out.targets.dims(), [6]);
    }

    #[test]
    fn test_multiple_choice_groups_choices_per_example() {
        let _rng  = rng_guard();
        let model = MultipleChoiceModel::<B>::new(&tiny_config(), &Default::default());
        let example = |idx, label| Example {
            idx,
            inputs: vec![encoded([1, 5, 2, 8, 2, 0]), encoded([1, 5, 2, 9, 2, 0])],
            label:  ExampleLabel::Class(label),
        };
        let out = model.forward_batch(batch(vec![example(0, 0), example(1, 1), example(2, 1)]));
        assert_eq!(out.logits.dims(), [3, 2]);
        assert_eq!(out.targets.dims(), [3]);
    }

    #[test]
    fn test_span_head_stacks_start_and_end() {
        let device = Default::default();
        let _rng   = rng_guard();
        let model  = SpanExtractor::<B>::new(&tiny_config(), &device);
        let batch  = TaskBatch::<B> {
            input_ids:      Tensor::from_ints([[1, 5, 6, 7, 2, 0]], &device),
            attention_mask: Tensor::from_ints([[1, 1, 1, 1, 1, 0]], &device),
            type_ids:       Tensor::zeros([1, 6], &device),
            labels:         Tensor::from_ints([[2, 3]], &device),
            num_choices:    1,
        };
        let out = model.forward_batch(batch);
        assert_eq!(out.logits.dims(), [2, 6]);
        let targets: Vec<i64> = out.targets.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(targets, vec![2, 3]);
    }
}
