// ============================================================
// Layer 4 — Dataset Registry
// ============================================================
// (dataset, configuration) → builder + task descriptor
//
//   hulu          cola                 sequence cls.   matthews_correlation
//   hulu          sst2 wnli            sequence cls.   accuracy
//   hulu          copa ws              multiple choice accuracy
//   hulu          rc                   span            record
//   nytk-nerkor   <genre> × 5          token cls.      seqeval
//   nerkor_1.41e  <genre> × 5          token cls.      seqeval
//   opinhubank    opinhubank           sequence cls.   accuracy
//
// Built once with `standard()` and passed around by reference.
// Nothing is registered after construction.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::data::builder::CorpusBuilder;
use crate::data::hulu::{Hulu, HuluTask};
use crate::data::nerkor::{NerKor, GENRES};
use crate::data::nerkor_extended::NerKorExtended;
use crate::data::opinhubank::OpinHuBank;
use crate::domain::{
    corpus::{Corpus, CorpusSplit, Split},
    task::{MetricId, TaskDescriptor, TaskType},
};
use crate::error::{HuevalError, Result};
use crate::infra::download::Fetcher;

struct RegistryEntry {
    descriptor: TaskDescriptor,
    builder:    Box<dyn CorpusBuilder>,
}

pub struct DatasetRegistry {
    entries: Vec<RegistryEntry>,
}

impl DatasetRegistry {
    /// Every corpus the harness knows about.
    pub fn standard() -> Self {
        let mut registry = Self { entries: Vec::new() };

        for task in HuluTask::ALL {
            let (task_type, metric) = match task {
                HuluTask::Cola => (TaskType::SequenceClassification, MetricId::MatthewsCorrelation),
                HuluTask::Sst2 | HuluTask::Wnli => (TaskType::SequenceClassification, MetricId::Accuracy),
                HuluTask::Copa | HuluTask::Ws   => (TaskType::MultipleChoiceQa, MetricId::Accuracy),
                HuluTask::Rc => (TaskType::SpanClassification, MetricId::Record),
            };
            registry.register(Box::new(Hulu::new(task)), task_type, metric);
        }

        for genre in GENRES {
            registry.register(
                Box::new(NerKor::new(genre)),
                TaskType::TokenClassification,
                MetricId::Seqeval,
            );
        }
        for genre in GENRES {
            registry.register(
                Box::new(NerKorExtended::new(genre)),
                TaskType::TokenClassification,
                MetricId::Seqeval,
            );
        }

        registry.register(Box::new(OpinHuBank), TaskType::SequenceClassification, MetricId::Accuracy);
        registry
    }

    fn register(&mut self, builder: Box<dyn CorpusBuilder>, task_type: TaskType, metric: MetricId) {
        let descriptor = TaskDescriptor::new(builder.dataset(), builder.config(), task_type, metric);
        self.entries.push(RegistryEntry { descriptor, builder });
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn available_datasets(&self) -> BTreeSet<&'static str> {
        self.entries.iter().map(|e| e.descriptor.dataset).collect()
    }

    pub fn available_configs(&self, name: &str) -> Result<BTreeSet<&'static str>> {
        let configs: BTreeSet<&'static str> = self
            .entries
            .iter()
            .filter(|e| e.descriptor.dataset == name)
            .map(|e| e.descriptor.config)
            .collect();

        if configs.is_empty() {
            return Err(HuevalError::UnknownDataset(name.to_string()));
        }
        Ok(configs)
    }

    pub fn descriptor(&self, name: &str, config: &str) -> Result<TaskDescriptor> {
        self.entry(name, config).map(|e| e.descriptor)
    }

    fn entry(&self, name: &str, config: &str) -> Result<&RegistryEntry> {
        // surfaces UnknownDataset before UnknownConfig
        self.available_configs(name)?;
        self.entries
            .iter()
            .find(|e| e.descriptor.dataset == name && e.descriptor.config == config)
            .ok_or_else(|| HuevalError::UnknownConfig {
                dataset: name.to_string(),
                config:  config.to_string(),
            })
    }

    /// Download (or find in the cache) the raw files of a configuration.
    pub fn download(&self, name: &str, config: &str, fetcher: &Fetcher) -> Result<PathBuf> {
        self.entry(name, config)?.builder.download(fetcher)
    }

    /// Download, then parse all three splits.
    pub fn load_dataset(&self, name: &str, config: &str, fetcher: &Fetcher) -> Result<Corpus> {
        let entry = self.entry(name, config)?;
        let root  = entry.builder.download(fetcher)?;
        build_corpus(entry, &root)
    }

    /// Parse all three splits from an already downloaded root.
    pub fn load_from(&self, name: &str, config: &str, root: &Path) -> Result<Corpus> {
        build_corpus(self.entry(name, config)?, root)
    }
}

fn build_corpus(entry: &RegistryEntry, root: &Path) -> Result<Corpus> {
    let builder = &entry.builder;
    let load = |split: Split| -> Result<CorpusSplit> {
        let rows = builder.parse(root, split)?.collect::<Result<Vec<_>>>()?;
        Ok(CorpusSplit::new(split, rows, builder.features()))
    };

    let corpus = Corpus {
        descriptor: entry.descriptor,
        train:      load(Split::Train)?,
        validation: load(Split::Validation)?,
        test:       load(Split::Test)?,
    };

    tracing::info!(
        "Loaded {}: {} train, {} validation, {} test rows",
        corpus.descriptor,
        corpus.train.len(),
        corpus.validation.len(),
        corpus.test.len(),
    );
    Ok(corpus)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::opinhubank::CSV_FILE;
    use crate::domain::row::{CorpusRow, LabelRef};
    use std::fs;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    /// Three non-empty splits keyed 0..n, every gold value inside the
    /// train split's label vocabulary.
    fn assert_keyed_splits(corpus: &Corpus, column: &str) {
        let labels = corpus.label_space(column).unwrap().len() as i64;
        for split in corpus.splits() {
            assert!(!split.is_empty(), "{} split is empty", split.split);
            let keys: Vec<usize> = split.rows.iter().map(|r| r.key).collect();
            assert_eq!(keys, (0..split.len()).collect::<Vec<_>>());
        }
        for split in [Split::Train, Split::Validation, Split::Test] {
            for label in corpus.observed_labels(split, column) {
                assert!(label < labels, "{split}: label {label} outside a vocabulary of {labels}");
            }
        }
    }

    #[test]
    fn test_available_datasets() {
        let registry = DatasetRegistry::standard();
        let names: Vec<_> = registry.available_datasets().into_iter().collect();
        assert_eq!(names, vec!["hulu", "nerkor_1.41e", "nytk-nerkor", "opinhubank"]);
    }

    #[test]
    fn test_available_configs() {
        let registry = DatasetRegistry::standard();
        let hulu: Vec<_> = registry.available_configs("hulu").unwrap().into_iter().collect();
        assert_eq!(hulu, vec!["cola", "copa", "rc", "sst2", "wnli", "ws"]);
        assert_eq!(registry.available_configs("nytk-nerkor").unwrap().len(), 5);
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = DatasetRegistry::standard();
        assert!(matches!(
            registry.available_configs("glue"),
            Err(HuevalError::UnknownDataset(_))
        ));
        assert!(matches!(
            registry.descriptor("hulu", "mnli"),
            Err(HuevalError::UnknownConfig { .. })
        ));
        assert!(matches!(
            registry.load_from("nope", "cola", Path::new("/nonexistent")),
            Err(HuevalError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_task_types_and_metrics() {
        let registry = DatasetRegistry::standard();
        let cola = registry.descriptor("hulu", "cola").unwrap();
        assert_eq!(cola.metric, MetricId::MatthewsCorrelation);
        assert_eq!(registry.descriptor("hulu", "rc").unwrap().task_type, TaskType::SpanClassification);
        assert_eq!(
            registry.descriptor("nerkor_1.41e", "legal").unwrap().task_type,
            TaskType::TokenClassification
        );
        assert_eq!(
            registry.descriptor("opinhubank", "opinhubank").unwrap().metric,
            MetricId::Accuracy
        );
    }

    #[test]
    fn test_sst2_loads_three_keyed_splits() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        for (file, labels) in [
            ("sst_train.json", vec!["\"positive\"", "\"negative\"", "\"neutral\"", "\"positive\""]),
            ("sst_dev.json",   vec!["\"neutral\"", "\"negative\""]),
            ("sst_test.json",  vec!["null", "null", "null"]),
        ] {
            let rows: Vec<String> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| format!(r#"{{"Sent_id": "s_{}", "Sent": "m{i}", "Label": {l}}}"#, i + 10))
                .collect();
            fs::write(data.join(file), format!("[{}]", rows.join(","))).unwrap();
        }

        let registry = DatasetRegistry::standard();
        let corpus   = registry.load_from("hulu", "sst2", dir.path()).unwrap();

        for split in corpus.splits() {
            let keys: Vec<usize> = split.rows.iter().map(|r| r.key).collect();
            assert_eq!(keys, (0..split.len()).collect::<Vec<_>>());
        }
        for row in &corpus.train.rows {
            match row.label("labels") {
                Some(LabelRef::Class(l)) => assert!((0..=2).contains(&l)),
                other => panic!("unexpected label {other:?}"),
            }
        }
        assert!(!corpus.test.has_gold_labels("labels"));
        assert_eq!(corpus.num_labels("labels").unwrap(), 3);
    }

    #[test]
    fn test_wnli_loads_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let pair = |id: usize, label: &str| {
            format!(r#"{{"id": {id}, "sentence1": "A{id} elment.", "sentence2": "B{id} elment."{label}}}"#)
        };
        let train: Vec<String> = (0..4).map(|i| pair(i, &format!(r#", "label": {}"#, i % 2))).collect();
        let dev:   Vec<String> = (4..6).map(|i| pair(i, &format!(r#", "label": {}"#, i % 2))).collect();
        let test:  Vec<String> = (6..9).map(|i| pair(i, "")).collect();
        write(dir.path(), "data/train.json", &format!("\u{feff}[{}]", train.join(",")));
        write(dir.path(), "data/dev.json",   &format!(r#"{{"data": [{}]}}"#, dev.join(",")));
        write(dir.path(), "data/test.json",  &format!(r#"{{"data": [{}]}}"#, test.join(",")));

        let registry = DatasetRegistry::standard();
        let corpus   = registry.load_from("hulu", "wnli", dir.path()).unwrap();

        assert_eq!(corpus.descriptor.task_type, TaskType::SequenceClassification);
        assert_keyed_splits(&corpus, "labels");
        assert_eq!(corpus.splits().map(CorpusSplit::len), [4, 2, 3]);
        assert_eq!(corpus.train.rows[3].idx, 3);
        assert!(corpus.validation.has_gold_labels("labels"));
        assert!(!corpus.test.has_gold_labels("labels"));
    }

    #[test]
    fn test_ws_resplits_single_file() {
        let dir  = tempfile::tempdir().unwrap();
        let rows: Vec<String> = (0..40)
            .map(|i| {
                let correct = if i % 2 == 0 { "Anna" } else { "Béla" };
                format!(
                    r#"{{"ID": {i}, "Question": "Ki jött {i}?", "Sent": "Anna és Béla {i}.",
                        "Answer1": "Anna", "Answer2": "Béla", "CorrectAnswer": "{correct}"}}"#
                )
            })
            .collect();
        write(dir.path(), "huws.json", &format!("[{}]", rows.join(",")));

        let registry = DatasetRegistry::standard();
        let corpus   = registry.load_from("hulu", "ws", dir.path()).unwrap();

        assert_eq!(corpus.descriptor.task_type, TaskType::MultipleChoiceQa);
        assert_keyed_splits(&corpus, "labels");
        assert_eq!(corpus.splits().map(CorpusSplit::len), [28, 4, 8]);
        assert!(corpus.test.has_gold_labels("labels"));

        let mut ids: Vec<i64> = corpus.splits().iter().flat_map(|s| s.rows.iter().map(|r| r.idx)).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_nerkor_loads_ner_from_pointer_files() {
        const HEADER: &str = "form\tlemma\tupos\txpos\tfeats\tconll:ner\n";
        let dir = tempfile::tempdir().unwrap();
        for (split, sentences) in [
            ("train", "Kovács\tKovács\tPROPN\t[/N]\t_\tB-PER\nJános\tJános\tPROPN\t[/N]\t_\tI-PER\nír\tír\tVERB\t[/V]\t_\tO\n\nPécs\tPécs\tPROPN\t[/N]\t_\tB-LOC\n\n"),
            ("devel", "Az\taz\tDET\t[/Det]\t_\tO\nMTA\tMTA\tPROPN\t[/N]\t_\tB-ORG\n\n"),
            ("test",  "Vége\tvég\tNOUN\t[/N]\t_\tO\n\n"),
        ] {
            write(dir.path(), &format!("data/genres/news/morph/{split}.tsv"), &format!("{HEADER}{sentences}"));
            write(
                dir.path(),
                &format!("data/train-devel-test/{split}/news/morph/{split}.tsv"),
                &format!("../../../../genres/news/morph/{split}.tsv\n"),
            );
        }

        let registry = DatasetRegistry::standard();
        let corpus   = registry.load_from("nytk-nerkor", "news", dir.path()).unwrap();

        assert_eq!(corpus.descriptor.task_type, TaskType::TokenClassification);
        assert_keyed_splits(&corpus, "ner");
        assert_keyed_splits(&corpus, "upos");
        assert_eq!(corpus.splits().map(CorpusSplit::len), [2, 1, 1]);

        let ner = corpus.label_space("ner").unwrap();
        match corpus.train.rows[0].label("ner") {
            Some(LabelRef::Sequence(tags)) => assert_eq!(
                tags,
                [ner.index_of("B-PER").unwrap(), ner.index_of("I-PER").unwrap(), ner.index_of("O").unwrap()]
            ),
            other => panic!("unexpected label {other:?}"),
        }
        assert!(corpus.train.rows.iter().all(CorpusRow::morph_tagged));
    }

    #[test]
    fn test_opinhubank_resplits_latin2_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("id,start,len,entity,sentence,url,a1,a2,a3,a4,a5\n");
        for i in 0..20 {
            let score = i % 3 - 1;
            body.push_str(&format!(
                "{i},0,5,Orbán,\"Orbán Viktor {i}. beszéde, őszintén.\",http://x.hu,{score},{score},{score},0,0\n"
            ));
        }
        let (encoded, _, _) = encoding_rs::ISO_8859_2.encode(&body);
        fs::write(dir.path().join(CSV_FILE), encoded).unwrap();

        let registry = DatasetRegistry::standard();
        let corpus   = registry.load_from("opinhubank", "opinhubank", dir.path()).unwrap();

        assert_eq!(corpus.descriptor.task_type, TaskType::SequenceClassification);
        assert_keyed_splits(&corpus, "label");
        assert_eq!(corpus.splits().map(CorpusSplit::len), [14, 2, 4]);
        assert!(corpus.test.has_gold_labels("label"));
    }
}
