// ============================================================
// Layer 5 — Task Adapters
// ============================================================
// Given a model identifier and a loaded corpus, build the head
// for the corpus's task type together with its tokenizer:
//
//   model identifier ─► CheckpointResolver ─► config.json
//                                          ─► tokenizer source
//                                          ─► optional encoder record
//   config.json      ─► EncoderConfig ─► head(num_labels)
//
// Output cardinality comes from the label vocabulary recorded on
// the training split; span extraction always predicts two
// distributions (start, end).

use burn::prelude::*;

use crate::domain::{corpus::Corpus, labels::ClassLabel, task::{MetricId, TaskType}};
use crate::error::Result;
use crate::infra::checkpoint::{load_encoder, CheckpointResolver, ResolvedCheckpoint, TokenizerSource};
use crate::infra::tokenizer_store::HfEncoder;
use crate::ml::heads::{MultipleChoiceModel, SequenceClassifier, SpanExtractor, TokenClassifier};
use crate::ml::model::{Encoder, EncoderConfig};

/// A head for one of the four task types.
#[derive(Debug, Clone)]
pub enum TaskModel<B: Backend> {
    Sequence(SequenceClassifier<B>),
    Token(TokenClassifier<B>),
    MultipleChoice(MultipleChoiceModel<B>),
    Span(SpanExtractor<B>),
}

impl<B: Backend> TaskModel<B> {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskModel::Sequence(_)       => TaskType::SequenceClassification,
            TaskModel::Token(_)          => TaskType::TokenClassification,
            TaskModel::MultipleChoice(_) => TaskType::MultipleChoiceQa,
            TaskModel::Span(_)           => TaskType::SpanClassification,
        }
    }

    pub fn encoder(&self) -> &Encoder<B> {
        match self {
            TaskModel::Sequence(m)       => &m.encoder,
            TaskModel::Token(m)          => &m.encoder,
            TaskModel::MultipleChoice(m) => &m.encoder,
            TaskModel::Span(m)           => &m.encoder,
        }
    }
}

/// Everything a run needs once the model is built.
pub struct RunParameters<B: Backend> {
    pub model:       TaskModel<B>,
    pub tokenizer:   HfEncoder,
    pub corpus:      Corpus,
    pub metric:      MetricId,
    /// Names behind the head's output indices
    pub label_names: ClassLabel,
    pub checkpoint:  ResolvedCheckpoint,
}

/// Shared inputs of every adapter.
pub struct AdapterContext<'a, B: Backend> {
    pub resolver:   CheckpointResolver<'a>,
    /// Requested sequence length; capped by the encoder's positions
    pub max_length: usize,
    pub device:     B::Device,
}

pub trait TaskAdapter<B: Backend> {
    fn task_type(&self) -> TaskType;

    fn create_model(
        &self,
        ctx:          &AdapterContext<'_, B>,
        model:        &str,
        label_column: &str,
        corpus:       Corpus,
    ) -> Result<RunParameters<B>>;
}

/// Adapter for a task type, for every type.
pub fn adapter_for<B: Backend>(task_type: TaskType) -> Box<dyn TaskAdapter<B>> {
    match task_type {
        TaskType::SequenceClassification => Box::new(SequenceClassificationAdapter),
        TaskType::TokenClassification    => Box::new(TokenClassificationAdapter),
        TaskType::MultipleChoiceQa       => Box::new(MultipleChoiceAdapter),
        TaskType::SpanClassification     => Box::new(SpanClassificationAdapter),
    }
}

// ─── Shared loading ───────────────────────────────────────────────────────────
struct Backbone {
    checkpoint: ResolvedCheckpoint,
    config:     EncoderConfig,
    tokenizer:  HfEncoder,
}

fn load_backbone<B: Backend>(ctx: &AdapterContext<'_, B>, model: &str) -> Result<Backbone> {
    let checkpoint = ctx.resolver.resolve(model)?;
    let config     = EncoderConfig::from_checkpoint(&checkpoint.config)?;

    let max_length = ctx.max_length.min(config.max_position_embeddings);
    let tokenizer  = match &checkpoint.tokenizer {
        TokenizerSource::Json(path)  => HfEncoder::from_file(path, max_length, checkpoint.lowercase)?,
        TokenizerSource::Vocab(path) => HfEncoder::from_vocab(path, max_length, checkpoint.lowercase)?,
    };

    tracing::info!(
        "Loaded '{}': hidden={} layers={} heads={} max_length={}",
        model, config.hidden_size, config.num_layers, config.num_heads, max_length,
    );
    Ok(Backbone { checkpoint, config, tokenizer })
}

/// Replace a freshly initialised encoder with recorded weights, if any.
fn with_weights<B: Backend>(
    encoder:    Encoder<B>,
    checkpoint: &ResolvedCheckpoint,
    device:     &B::Device,
) -> Result<Encoder<B>> {
    match &checkpoint.weights {
        Some(stem) => load_encoder(encoder, stem, device),
        None => {
            tracing::warn!("No encoder record for '{}'; weights are randomly initialised", checkpoint.model);
            Ok(encoder)
        }
    }
}

fn parameters<B: Backend>(
    backbone:    Backbone,
    model:       TaskModel<B>,
    corpus:      Corpus,
    label_names: ClassLabel,
) -> RunParameters<B> {
    let metric = corpus.descriptor.metric;
    RunParameters {
        model,
        tokenizer: backbone.tokenizer,
        corpus,
        metric,
        label_names,
        checkpoint: backbone.checkpoint,
    }
}

// ─── Adapters ─────────────────────────────────────────────────────────────────
pub struct SequenceClassificationAdapter;

impl<B: Backend> TaskAdapter<B> for SequenceClassificationAdapter {
    fn task_type(&self) -> TaskType {
        TaskType::SequenceClassification
    }

    fn create_model(
        &self,
        ctx:          &AdapterContext<'_, B>,
        model:        &str,
        label_column: &str,
        corpus:       Corpus,
    ) -> Result<RunParameters<B>> {
        let label_names = corpus.label_space(label_column)?.clone();
        let backbone    = load_backbone(ctx, model)?;

        let mut head = SequenceClassifier::new(&backbone.config, label_names.len(), &ctx.device);
        head.encoder = with_weights(head.encoder, &backbone.checkpoint, &ctx.device)?;
        Ok(parameters(backbone, TaskModel::Sequence(head), corpus, label_names))
    }
}

pub struct TokenClassificationAdapter;

impl<B: Backend> TaskAdapter<B> for TokenClassificationAdapter {
    fn task_type(&self) -> TaskType {
        TaskType::TokenClassification
    }

    fn create_model(
        &self,
        ctx:          &AdapterContext<'_, B>,
        model:        &str,
        label_column: &str,
        corpus:       Corpus,
    ) -> Result<RunParameters<B>> {
        let label_names = corpus.label_space(label_column)?.clone();
        let backbone    = load_backbone(ctx, model)?;

        let mut head = TokenClassifier::new(&backbone.config, label_names.len(), &ctx.device);
        head.encoder = with_weights(head.encoder, &backbone.checkpoint, &ctx.device)?;
        Ok(parameters(backbone, TaskModel::Token(head), corpus, label_names))
    }
}

pub struct MultipleChoiceAdapter;

impl<B: Backend> TaskAdapter<B> for MultipleChoiceAdapter {
    fn task_type(&self) -> TaskType {
        TaskType::MultipleChoiceQa
    }

    fn create_model(
        &self,
        ctx:          &AdapterContext<'_, B>,
        model:        &str,
        label_column: &str,
        corpus:       Corpus,
    ) -> Result<RunParameters<B>> {
        // one score per choice; the vocabulary names the choices
        let label_names = corpus.label_space(label_column)?.clone();
        let backbone    = load_backbone(ctx, model)?;

        let mut head = MultipleChoiceModel::new(&backbone.config, &ctx.device);
        head.encoder = with_weights(head.encoder, &backbone.checkpoint, &ctx.device)?;
        Ok(parameters(backbone, TaskModel::MultipleChoice(head), corpus, label_names))
    }
}

pub struct SpanClassificationAdapter;

impl<B: Backend> TaskAdapter<B> for SpanClassificationAdapter {
    fn task_type(&self) -> TaskType {
        TaskType::SpanClassification
    }

    fn create_model(
        &self,
        ctx:           &AdapterContext<'_, B>,
        model:         &str,
        _label_column: &str,
        corpus:        Corpus,
    ) -> Result<RunParameters<B>> {
        let backbone = load_backbone(ctx, model)?;

        let mut head = SpanExtractor::new(&backbone.config, &ctx.device);
        head.encoder = with_weights(head.encoder, &backbone.checkpoint, &ctx.device)?;
        Ok(parameters(backbone, TaskModel::Span(head), corpus, ClassLabel::new(["start", "end"])))
    }
}
