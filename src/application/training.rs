// ============================================================
// Layer 2 — Training Orchestrator
// ============================================================
// One configured model × task run:
//
//   configured ──train()──► trained ──eval()──► evaluated
//
// Construction picks the aligner for the corpus's task type,
// builds the head through its adapter, and tokenises all three
// splits up front. Span extraction has no aligner and is
// rejected here.
//
// eval() returns None without scoring when the test split ships
// only sentinel labels.

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use std::fmt;

use crate::application::train_use_case::RunConfig;
use crate::data::{
    aligner::{align_rows, Aligner, MultipleChoiceAligner, SequenceAligner, TokenAligner},
    dataset::{Example, ExampleDataset},
    registry::DatasetRegistry,
};
use crate::domain::{
    corpus::{Corpus, Split},
    labels::ClassLabel,
    task::{MetricId, TaskDescriptor, TaskType},
};
use crate::error::HuevalError;
use crate::infra::{
    checkpoint::{save_encoder, CheckpointResolver, ResolvedCheckpoint},
    download::Fetcher,
    metrics::MetricsLogger,
};
use crate::ml::{
    adapter::{adapter_for, AdapterContext, RunParameters, TaskModel},
    heads::TaskHead,
    trainer::{fit, Evaluation, Evaluator},
};

/// Label column whose rows need morphological annotation.
pub const UPOS_COLUMN: &str = "upos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configured,
    Trained,
    Evaluated,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Configured => "configured",
            RunState::Trained    => "trained",
            RunState::Evaluated  => "evaluated",
        })
    }
}

// ─── Task plan ────────────────────────────────────────────────────────────────
/// The aligner a task type is prepared with, fixed at construction.
#[derive(Debug, Clone)]
pub enum TaskPlan {
    Sequence(SequenceAligner),
    Token(TokenAligner),
    MultipleChoice(MultipleChoiceAligner),
}

impl TaskPlan {
    pub fn for_task(descriptor: &TaskDescriptor, label_column: &str, label_all_tokens: bool) -> crate::error::Result<Self> {
        match descriptor.task_type {
            TaskType::SequenceClassification => {
                SequenceAligner::for_task(descriptor, label_column).map(TaskPlan::Sequence)
            }
            TaskType::TokenClassification => Ok(TaskPlan::Token(
                TokenAligner::new(label_column).with_label_all_tokens(label_all_tokens),
            )),
            TaskType::MultipleChoiceQa => {
                MultipleChoiceAligner::for_task(descriptor, label_column).map(TaskPlan::MultipleChoice)
            }
            TaskType::SpanClassification => {
                Err(HuevalError::UnsupportedTaskType(TaskType::SpanClassification))
            }
        }
    }

    pub fn aligner(&self) -> &dyn Aligner {
        match self {
            TaskPlan::Sequence(a)       => a,
            TaskPlan::Token(a)          => a,
            TaskPlan::MultipleChoice(a) => a,
        }
    }
}

/// Seed the backend, then build the head for `task_type`, so the
/// initial weights depend only on `config.training.seed`.
pub fn build_parameters<B: AutodiffBackend>(
    ctx:       &AdapterContext<'_, B>,
    task_type: TaskType,
    config:    &RunConfig,
    corpus:    Corpus,
) -> crate::error::Result<RunParameters<B>> {
    B::seed(config.training.seed);
    adapter_for::<B>(task_type).create_model(ctx, &config.model, &config.label_column, corpus)
}

/// Drop rows that cannot be trained on for `label_column`.
pub fn filter_rows(corpus: &mut Corpus, label_column: &str) {
    if label_column == UPOS_COLUMN {
        let before = corpus.train.len();
        corpus.retain(|row| row.morph_tagged());
        tracing::info!(
            "Kept {} of {} training sentences with morphological annotation",
            corpus.train.len(), before,
        );
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
pub struct Training<B: AutodiffBackend> {
    config:        RunConfig,
    model:         Option<TaskModel<B>>,
    metric:        MetricId,
    label_names:   ClassLabel,
    checkpoint:    ResolvedCheckpoint,
    train:         Vec<Example>,
    validation:    Vec<Example>,
    test:          Vec<Example>,
    test_has_gold: bool,
    logger:        MetricsLogger,
    device:        B::Device,
    state:         RunState,
}

impl<B: AutodiffBackend> Training<B> {
    /// Look up the corpus, build the head and tokenise every split.
    pub fn prepare(
        config:   RunConfig,
        registry: &DatasetRegistry,
        fetcher:  &Fetcher,
        device:   B::Device,
    ) -> Result<Self> {
        let descriptor = registry.descriptor(&config.dataset, &config.config)?;
        // fail before any download when the task type cannot be trained
        let plan = TaskPlan::for_task(&descriptor, &config.label_column, config.label_all_tokens)?;

        let mut corpus = registry
            .load_dataset(&config.dataset, &config.config, fetcher)
            .with_context(|| format!("Cannot load {descriptor}"))?;
        filter_rows(&mut corpus, &config.label_column);

        let ctx = AdapterContext {
            resolver:   CheckpointResolver::new(fetcher),
            max_length: config.max_length,
            device:     device.clone(),
        };
        let params = build_parameters(&ctx, descriptor.task_type, &config, corpus)
            .with_context(|| format!("Cannot build '{}' for {descriptor}", config.model))?;

        Self::assemble(config, plan, params, device)
    }

    /// Tokenise the corpus held by `params` and bind the run to it.
    pub fn assemble(
        config: RunConfig,
        plan:   TaskPlan,
        params: RunParameters<B>,
        device: B::Device,
    ) -> Result<Self> {
        let RunParameters { model, tokenizer, corpus, metric, label_names, checkpoint } = params;

        let aligner = plan.aligner();
        let align = |split: Split| -> Result<Vec<Example>> {
            let examples = align_rows(aligner, &corpus.split(split).rows, &tokenizer)
                .with_context(|| format!("Cannot tokenise the {split} split"))?;
            tracing::info!("Tokenised {} {} examples", examples.len(), split);
            Ok(examples)
        };
        let train      = align(Split::Train)?;
        let validation = align(Split::Validation)?;
        let test       = align(Split::Test)?;

        let test_has_gold = corpus.test.has_gold_labels(&config.label_column);
        let logger        = MetricsLogger::new(&config.output_dir, metric)?;

        Ok(Self {
            config,
            model: Some(model),
            metric,
            label_names,
            checkpoint,
            train,
            validation,
            test,
            test_has_gold,
            logger,
            device,
            state: RunState::Configured,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn evaluator(&self) -> Evaluator {
        Evaluator {
            metric:      self.metric,
            label_names: self.label_names.clone(),
            batch_size:  self.config.training.eval_batch_size,
        }
    }

    fn invalid(&self, action: &'static str) -> anyhow::Error {
        HuevalError::InvalidState { action, state: self.state.to_string() }.into()
    }

    /// Fine-tune the head on the training split. If fitting fails the
    /// run keeps its untrained head and stays configured. A failed save
    /// leaves the trained head in place, ready for `eval`.
    pub fn train(&mut self) -> Result<()> {
        if self.state != RunState::Configured {
            return Err(self.invalid("train"));
        }
        // fit consumes its input; self.model is only replaced on success
        let model = self.model.clone().ok_or_else(|| self.invalid("train"))?;

        let args      = &self.config.training;
        let evaluator = self.evaluator();
        let train     = self.train.clone();
        let valid     = self.validation.clone();
        let logger    = Some(&self.logger);
        let device    = &self.device;

        let trained = match model {
            TaskModel::Sequence(m) => {
                TaskModel::Sequence(fit::<B, _>(m, args, train, valid, &evaluator, logger, device)?)
            }
            TaskModel::Token(m) => {
                TaskModel::Token(fit::<B, _>(m, args, train, valid, &evaluator, logger, device)?)
            }
            TaskModel::MultipleChoice(m) => {
                TaskModel::MultipleChoice(fit::<B, _>(m, args, train, valid, &evaluator, logger, device)?)
            }
            TaskModel::Span(_) => {
                return Err(HuevalError::UnsupportedTaskType(TaskType::SpanClassification).into());
            }
        };

        self.model = Some(trained);
        self.state = RunState::Trained;

        if self.config.save_model {
            if let Some(model) = &self.model {
                save_encoder(model.encoder(), &self.checkpoint, &self.config.output_dir)?;
            }
        }
        Ok(())
    }

    /// Score the trained head on the test split.
    pub fn eval(&mut self) -> Result<Option<Evaluation>> {
        if self.state != RunState::Trained {
            return Err(self.invalid("evaluate"));
        }
        self.state = RunState::Evaluated;

        if !self.test_has_gold {
            tracing::info!("Test split of {} has no gold labels; skipping evaluation", self.config.config);
            return Ok(None);
        }
        let Some(model) = self.model.as_ref() else {
            return Err(self.invalid("evaluate"));
        };

        let evaluator = self.evaluator();
        let test      = ExampleDataset::new(self.test.clone());
        let result = match model {
            TaskModel::Sequence(m)       => evaluate_valid::<B, _>(m, &evaluator, test, &self.device)?,
            TaskModel::Token(m)          => evaluate_valid::<B, _>(m, &evaluator, test, &self.device)?,
            TaskModel::MultipleChoice(m) => evaluate_valid::<B, _>(m, &evaluator, test, &self.device)?,
            TaskModel::Span(_) => {
                return Err(HuevalError::UnsupportedTaskType(TaskType::SpanClassification).into());
            }
        };

        self.logger.log_test(result.loss, &result.scores)?;
        Ok(Some(result))
    }
}

fn evaluate_valid<B, M>(
    model:     &M,
    evaluator: &Evaluator,
    dataset:   ExampleDataset,
    device:    &B::Device,
) -> crate::error::Result<Evaluation>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    M::InnerModule: TaskHead<B::InnerBackend>,
{
    evaluator.evaluate::<B::InnerBackend, _>(&model.valid(), dataset, device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::{CorpusRow, RowBody, TaggedSentence};
    use crate::ml::adapter::tests::{sst2_corpus, tiny_checkpoint};
    use crate::ml::model::tests::{rng_guard, B};
    use crate::ml::trainer::TrainingArgs;
    use burn::backend::Autodiff;

    type A = Autodiff<B>;

    fn run_config(output: &std::path::Path) -> RunConfig {
        RunConfig {
            training: TrainingArgs { epochs: 1, train_batch_size: 2, eval_batch_size: 2, ..Default::default() },
            output_dir: output.to_path_buf(),
            ..RunConfig::new("tiny", "hulu", "sst2", "labels")
        }
    }

    fn parameters(corpus: Corpus, config: &RunConfig) -> RunParameters<A> {
        let ckpt    = tiny_checkpoint();
        let cache   = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::with_cache_dir(cache.path()).unwrap();
        let ctx = AdapterContext::<A> {
            resolver:   CheckpointResolver::new(&fetcher),
            max_length: 12,
            device:     Default::default(),
        };
        let config = RunConfig { model: ckpt.path().to_string_lossy().into_owned(), ..config.clone() };
        build_parameters(&ctx, TaskType::SequenceClassification, &config, corpus).unwrap()
    }

    /// Callers hold `rng_guard()` for as long as the run trains.
    fn training(corpus: Corpus, output: &std::path::Path) -> Training<A> {
        let config = run_config(output);
        let plan   = TaskPlan::for_task(&corpus.descriptor, "labels", false).unwrap();
        let params = parameters(corpus, &config);
        Training::assemble(config, plan, params, Default::default()).unwrap()
    }

    fn classifier_weights(params: RunParameters<A>) -> Vec<f32> {
        match params.model {
            TaskModel::Sequence(head) => head.classifier.weight.val().into_data().to_vec::<f32>().unwrap(),
            other => panic!("unexpected head {:?}", other.task_type()),
        }
    }

    fn tagged(key: usize, morph_tagged: bool) -> CorpusRow {
        CorpusRow::new(key, key as i64, RowBody::Tagged(TaggedSentence {
            tokens: vec!["alma".into()],
            upos:   vec![0],
            ner:    vec![0],
            morph_tagged,
            ..Default::default()
        }))
    }

    #[test]
    fn test_span_task_is_rejected() {
        let rc  = TaskDescriptor::new("hulu", "rc", TaskType::SpanClassification, MetricId::Record);
        let err = TaskPlan::for_task(&rc, "labels", false).unwrap_err();
        assert!(matches!(err, HuevalError::UnsupportedTaskType(TaskType::SpanClassification)));
    }

    #[test]
    fn test_plan_follows_task_type() {
        let cola = TaskDescriptor::new("hulu", "cola", TaskType::SequenceClassification, MetricId::MatthewsCorrelation);
        let ner  = TaskDescriptor::new("nytk-nerkor", "news", TaskType::TokenClassification, MetricId::Seqeval);
        let copa = TaskDescriptor::new("hulu", "copa", TaskType::MultipleChoiceQa, MetricId::Accuracy);
        assert!(matches!(TaskPlan::for_task(&cola, "labels", false).unwrap(), TaskPlan::Sequence(_)));
        assert!(matches!(TaskPlan::for_task(&ner, "ner", false).unwrap(), TaskPlan::Token(_)));
        assert!(matches!(TaskPlan::for_task(&copa, "labels", false).unwrap(), TaskPlan::MultipleChoice(_)));
    }

    #[test]
    fn test_upos_keeps_only_morph_tagged_rows() {
        let mut corpus = sst2_corpus();
        corpus.train.rows = vec![tagged(0, true), tagged(1, false), tagged(2, true)];
        filter_rows(&mut corpus, "upos");
        assert_eq!(corpus.train.len(), 2);
        assert_eq!(corpus.train.rows[1].key, 1);

        let mut untouched = sst2_corpus();
        untouched.train.rows = vec![tagged(0, false)];
        filter_rows(&mut untouched, "ner");
        assert_eq!(untouched.train.len(), 1);
    }

    #[test]
    fn test_eval_before_train_is_invalid() {
        let _rng = rng_guard();
        let out  = tempfile::tempdir().unwrap();
        let mut run = training(sst2_corpus(), out.path());
        let err = run.eval().unwrap_err();
        assert!(matches!(err.downcast_ref::<HuevalError>(), Some(HuevalError::InvalidState { .. })));
        assert_eq!(run.state(), RunState::Configured);
    }

    #[test]
    fn test_train_twice_is_invalid() {
        let _rng = rng_guard();
        let out  = tempfile::tempdir().unwrap();
        let mut run = training(sst2_corpus(), out.path());
        run.train().unwrap();
        assert_eq!(run.state(), RunState::Trained);

        let err = run.train().unwrap_err();
        assert!(matches!(err.downcast_ref::<HuevalError>(), Some(HuevalError::InvalidState { .. })));
    }

    #[test]
    fn test_eval_without_gold_labels_short_circuits() {
        let _rng = rng_guard();
        let out  = tempfile::tempdir().unwrap();
        let mut run = training(sst2_corpus(), out.path());
        run.train().unwrap();
        assert_eq!(run.eval().unwrap(), None);
        assert_eq!(run.state(), RunState::Evaluated);

        // metrics.csv holds the header and one epoch row, no test row
        let csv = std::fs::read_to_string(out.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_eval_with_gold_labels_scores_test_split() {
        let mut corpus = sst2_corpus();
        for row in &mut corpus.test.rows {
            if let RowBody::Sentence { label, .. } = &mut row.body {
                *label = 0;
            }
        }
        let _rng = rng_guard();
        let out  = tempfile::tempdir().unwrap();
        let mut run = training(corpus, out.path());
        run.train().unwrap();

        let result = run.eval().unwrap().unwrap();
        assert!(result.scores.contains_key("accuracy"));
    }

    #[test]
    fn test_failed_training_keeps_model_and_state() {
        let _rng = rng_guard();
        let out  = tempfile::tempdir().unwrap();
        let mut corpus = sst2_corpus();
        corpus.train.rows.clear();
        let mut run = training(corpus, out.path());

        let err = run.train().unwrap_err();
        assert!(matches!(err.downcast_ref::<HuevalError>(), Some(HuevalError::Training(_))));
        assert_eq!(run.state(), RunState::Configured);
        assert!(run.model.is_some());

        // a retry reaches the trainer again instead of an invalid-state error
        let retry = run.train().unwrap_err();
        assert!(matches!(retry.downcast_ref::<HuevalError>(), Some(HuevalError::Training(_))));
    }

    #[test]
    fn test_seed_fixes_initial_head_weights() {
        let _rng   = rng_guard();
        let out    = tempfile::tempdir().unwrap();
        let config = run_config(out.path());

        let first  = classifier_weights(parameters(sst2_corpus(), &config));
        let second = classifier_weights(parameters(sst2_corpus(), &config));
        assert_eq!(first, second);

        let reseeded = RunConfig {
            training: TrainingArgs { seed: 7, ..config.training.clone() },
            ..config
        };
        assert_ne!(classifier_weights(parameters(sst2_corpus(), &reseeded)), first);
    }
}
