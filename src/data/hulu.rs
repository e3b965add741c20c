// ============================================================
// Layer 4 — HuLU Builder
// ============================================================
// The Hungarian Language Understanding benchmark: six corpora,
// each published in its own repository at a pinned commit.
//
//   cola  acceptability           {"data": [{Sent_id, Sent, Label}]}
//   sst2  sentiment               [{Sent_id, Sent, Label}]
//   wnli  entailment              [...] / {"data": [...]}, UTF-8 BOM
//   copa  causal reasoning        [{idx, premise, question, choice1, choice2, label}]
//   ws    Winograd schemas        one file, re-split 80/(0.7·n)/20
//   rc    reading comprehension   [{id, lead, passage, query, MASK}]
//
// Test splits of cola, sst2, wnli and copa ship without labels;
// their rows carry UNKNOWN_LABEL.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::data::builder::{id_suffix, json_int, keyed_vec, read_json, CorpusBuilder, RowStream};
use crate::data::splitter::{split_three_way, SPLIT_SEED};
use crate::domain::{
    corpus::Split,
    labels::{ClassLabel, Features},
    row::{AnswerSpan, PassageQuery, RowBody, UNKNOWN_LABEL},
};
use crate::error::{HuevalError, Result};
use crate::infra::download::{archive_root, Fetcher};

const COLA_URL: &str = "https://github.com/nytud/HuCOLA/archive/32752a757dbecba7c935e6d75641758aeccbfd54.zip";
const COPA_URL: &str = "https://github.com/nytud/HuCoPA/archive/088bcf06ea16bc62fe4ee0cdbf083d3209236a4c.zip";
const WNLI_URL: &str = "https://github.com/nytud/HuWNLI/archive/6c79db979d0053511d986c15e0da784f1e33c0eb.zip";
const SST_URL:  &str = "https://github.com/nytud/HuSST/archive/bcf352f37ddd4c5257245adea5defeaf8d1bc148.zip";
const WS_URL:   &str = "https://github.com/nytud/HuWS/archive/cd12288254f0e5db9976eca6bcf1184c521eef94.zip";
const RC_BASE:  &str = "https://huggingface.co/datasets/NYTK/HuRC/resolve/b45ea6dbdec3b8692f02df89e8f943fa8d84e5bf/data";

/// The six HuLU configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HuluTask {
    Cola,
    Sst2,
    Wnli,
    Copa,
    Ws,
    Rc,
}

impl HuluTask {
    pub const ALL: [HuluTask; 6] = [
        HuluTask::Cola,
        HuluTask::Sst2,
        HuluTask::Wnli,
        HuluTask::Copa,
        HuluTask::Ws,
        HuluTask::Rc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HuluTask::Cola => "cola",
            HuluTask::Sst2 => "sst2",
            HuluTask::Wnli => "wnli",
            HuluTask::Copa => "copa",
            HuluTask::Ws   => "ws",
            HuluTask::Rc   => "rc",
        }
    }

    /// Class names of the `labels` column. ReCoRD-style rc has none.
    pub fn label_classes(&self) -> Option<ClassLabel> {
        match self {
            HuluTask::Cola => Some(ClassLabel::new(["unacceptable", "acceptable"])),
            HuluTask::Sst2 => Some(ClassLabel::new(["negative", "neutral", "positive"])),
            HuluTask::Wnli => Some(ClassLabel::new(["not_entailment", "entailment"])),
            HuluTask::Copa | HuluTask::Ws => Some(ClassLabel::new(["choice1", "choice2"])),
            HuluTask::Rc => None,
        }
    }

    fn archive_url(&self) -> Option<&'static str> {
        match self {
            HuluTask::Cola => Some(COLA_URL),
            HuluTask::Sst2 => Some(SST_URL),
            HuluTask::Wnli => Some(WNLI_URL),
            HuluTask::Copa => Some(COPA_URL),
            HuluTask::Ws   => Some(WS_URL),
            HuluTask::Rc   => None,
        }
    }

    /// File of a split, relative to the download root.
    pub fn relative_path(&self, split: Split) -> &'static str {
        match (self, split) {
            (HuluTask::Cola, Split::Train)      => "data/cola_train.json",
            (HuluTask::Cola, Split::Validation) => "data/cola_dev.json",
            (HuluTask::Cola, Split::Test)       => "data/cola_test.json",
            (HuluTask::Sst2, Split::Train)      => "data/sst_train.json",
            (HuluTask::Sst2, Split::Validation) => "data/sst_dev.json",
            (HuluTask::Sst2, Split::Test)       => "data/sst_test.json",
            (HuluTask::Wnli, Split::Train)      => "data/train.json",
            (HuluTask::Wnli, Split::Validation) => "data/dev.json",
            (HuluTask::Wnli, Split::Test)       => "data/test.json",
            (HuluTask::Copa, Split::Train)      => "data/train.json",
            (HuluTask::Copa, Split::Validation) => "data/val.json",
            (HuluTask::Copa, Split::Test)       => "data/test.json",
            (HuluTask::Ws, _)                   => "huws.json",
            (HuluTask::Rc, Split::Train)        => "hurc_train.json",
            (HuluTask::Rc, Split::Validation)   => "hurc_val.json",
            (HuluTask::Rc, Split::Test)         => "hurc_test.json",
        }
    }
}

/// Builder for one HuLU configuration.
#[derive(Debug, Clone, Copy)]
pub struct Hulu {
    task: HuluTask,
}

impl Hulu {
    pub fn new(task: HuluTask) -> Self {
        Self { task }
    }

    pub fn task(&self) -> HuluTask {
        self.task
    }
}

impl CorpusBuilder for Hulu {
    fn dataset(&self) -> &'static str {
        "hulu"
    }

    fn config(&self) -> &'static str {
        self.task.name()
    }

    fn features(&self) -> Features {
        match self.task.label_classes() {
            Some(label) => Features::new().with_label("labels", label),
            None        => Features::new(),
        }
    }

    fn download(&self, fetcher: &Fetcher) -> Result<PathBuf> {
        match self.task.archive_url() {
            Some(url) => {
                let archive = fetcher.fetch(url, format!("hulu/{}.zip", self.task.name()))?;
                let dir     = fetcher.extract_zip(&archive)?;
                archive_root(&dir)
            }
            None => {
                for split in Split::ALL {
                    let file = self.task.relative_path(split);
                    fetcher.fetch(&format!("{RC_BASE}/{file}"), format!("hulu/rc/{file}"))?;
                }
                Ok(fetcher.cache_path("hulu/rc"))
            }
        }
    }

    fn parse(&self, root: &Path, split: Split) -> Result<RowStream> {
        let path = root.join(self.task.relative_path(split));
        tracing::debug!("Parsing hulu/{} {} from {}", self.task.name(), split, path.display());

        let rows = match self.task {
            HuluTask::Cola => parse_cola(&path)?,
            HuluTask::Sst2 => parse_sst(&path)?,
            HuluTask::Wnli => parse_wnli(&path)?,
            HuluTask::Copa => parse_copa(&path)?,
            HuluTask::Ws   => parse_ws(&path, split)?,
            HuluTask::Rc   => parse_rc(&path, split)?,
        };
        Ok(keyed_vec(rows))
    }
}

// ─── Raw file schemas ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Wrapped<T> {
    data: Vec<T>,
}

/// wnli ships train as a bare list and dev/test wrapped in {"data": ...}
#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrWrapped<T> {
    List(Vec<T>),
    Wrapped(Wrapped<T>),
}

impl<T> ListOrWrapped<T> {
    fn into_rows(self) -> Vec<T> {
        match self {
            ListOrWrapped::List(rows)    => rows,
            ListOrWrapped::Wrapped(w)    => w.data,
        }
    }
}

#[derive(Deserialize)]
struct SentRow {
    #[serde(rename = "Sent_id")]
    sent_id: String,
    #[serde(rename = "Sent")]
    sent:    String,
    #[serde(rename = "Label", default)]
    label:   Option<Value>,
}

#[derive(Deserialize)]
struct WnliRow {
    id:        Value,
    sentence1: String,
    sentence2: String,
    #[serde(default)]
    label:     Option<Value>,
}

#[derive(Deserialize)]
struct CopaRow {
    idx:      Value,
    premise:  String,
    question: String,
    choice1:  String,
    choice2:  String,
    #[serde(default)]
    label:    Option<Value>,
}

#[derive(Deserialize, Clone)]
struct WsRow {
    #[serde(rename = "ID")]
    id:             Value,
    #[serde(rename = "Question")]
    question:       String,
    #[serde(rename = "Sent")]
    sent:           String,
    #[serde(rename = "Answer1")]
    answer1:        String,
    #[serde(rename = "Answer2")]
    answer2:        String,
    #[serde(rename = "CorrectAnswer")]
    correct_answer: String,
}

#[derive(Deserialize)]
struct RcRow {
    id:      Value,
    lead:    Vec<String>,
    passage: Vec<String>,
    query:   String,
    #[serde(rename = "MASK", default)]
    mask:    Option<String>,
}

// ─── Per-configuration parsers ────────────────────────────────────────────────

fn source(path: &Path) -> String {
    path.display().to_string()
}

fn sentence_idx(sent_id: &str, path: &Path) -> Result<i64> {
    id_suffix(sent_id)
        .ok_or_else(|| HuevalError::parse(source(path), format!("bad Sent_id '{sent_id}'")))
}

fn int_or_missing(value: Option<&Value>, path: &Path, field: &str) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => json_int(v)
            .map(Some)
            .ok_or_else(|| HuevalError::parse(source(path), format!("non-integer {field}: {v}"))),
    }
}

fn id_value(value: &Value, path: &Path) -> Result<i64> {
    match value {
        Value::String(s) => id_suffix(s),
        other            => json_int(other),
    }
    .ok_or_else(|| HuevalError::parse(source(path), format!("bad id {value}")))
}

fn parse_cola(path: &Path) -> Result<Vec<(i64, RowBody)>> {
    let file: Wrapped<SentRow> = read_json(path)?;
    file.data
        .into_iter()
        .map(|row| {
            let idx   = sentence_idx(&row.sent_id, path)?;
            let label = int_or_missing(row.label.as_ref(), path, "Label")?.unwrap_or(UNKNOWN_LABEL);
            Ok((idx, RowBody::Sentence { sentence: row.sent, label }))
        })
        .collect()
}

fn parse_sst(path: &Path) -> Result<Vec<(i64, RowBody)>> {
    let classes = HuluTask::Sst2.label_classes().unwrap_or_else(|| ClassLabel::new(Vec::<String>::new()));
    let rows: Vec<SentRow> = read_json(path)?;
    rows.into_iter()
        .map(|row| {
            let idx   = sentence_idx(&row.sent_id, path)?;
            let label = match row.label {
                None | Some(Value::Null)  => UNKNOWN_LABEL,
                Some(Value::String(name)) => classes.encode(&name, &source(path))?,
                Some(other) => {
                    return Err(HuevalError::parse(source(path), format!("bad sentiment label {other}")))
                }
            };
            Ok((idx, RowBody::Sentence { sentence: row.sent, label }))
        })
        .collect()
}

fn parse_wnli(path: &Path) -> Result<Vec<(i64, RowBody)>> {
    let file: ListOrWrapped<WnliRow> = read_json(path)?;
    file.into_rows()
        .into_iter()
        .map(|row| {
            let idx   = id_value(&row.id, path)?;
            let label = int_or_missing(row.label.as_ref(), path, "label")?.unwrap_or(UNKNOWN_LABEL);
            Ok((idx, RowBody::SentencePair {
                sentence1: row.sentence1,
                sentence2: row.sentence2,
                label,
            }))
        })
        .collect()
}

fn parse_copa(path: &Path) -> Result<Vec<(i64, RowBody)>> {
    let rows: Vec<CopaRow> = read_json(path)?;
    rows.into_iter()
        .map(|row| {
            let idx = id_value(&row.idx, path)?;
            // labels are 1-based on disk
            let label = int_or_missing(row.label.as_ref(), path, "label")?
                .map(|l| l - 1)
                .unwrap_or(UNKNOWN_LABEL);
            Ok((idx, RowBody::Choice {
                context:  row.premise,
                question: row.question,
                choices:  vec![row.choice1, row.choice2],
                label,
            }))
        })
        .collect()
}

fn parse_ws(path: &Path, split: Split) -> Result<Vec<(i64, RowBody)>> {
    let rows: Vec<WsRow> = read_json(path)?;
    let parts = split_three_way(rows, SPLIT_SEED);
    let rows  = match split {
        Split::Train      => parts.train,
        Split::Validation => parts.validation,
        Split::Test       => parts.test,
    };

    rows.into_iter()
        .map(|row| {
            let idx   = id_value(&row.id, path)?;
            let label = if row.answer1 == row.correct_answer { 0 } else { 1 };
            Ok((idx, RowBody::Choice {
                context:  row.sent,
                question: row.question,
                choices:  vec![row.answer1, row.answer2],
                label,
            }))
        })
        .collect()
}

fn parse_rc(path: &Path, split: Split) -> Result<Vec<(i64, RowBody)>> {
    let rows: Vec<RcRow> = read_json(path)?;
    let total = rows.len();
    let mut out = Vec::with_capacity(total);

    for row in rows {
        let idx    = id_value(&row.id, path)?;
        let answer = row.mask.unwrap_or_default();
        let lead   = row.lead.into_iter().next().unwrap_or_default();

        let span = if split == Split::Test {
            None
        } else {
            match locate_answer(&row.passage, &answer) {
                Some(span) => Some(span),
                None => {
                    tracing::debug!("rc row {} has no passage containing its answer", idx);
                    continue;
                }
            }
        };

        out.push((idx, RowBody::Passage(PassageQuery {
            lead,
            passages: row.passage,
            query:    row.query,
            answer,
            span,
        })));
    }

    if out.len() < total {
        tracing::warn!(
            "rc {}: skipped {} of {} rows whose answer is not in any passage",
            split,
            total - out.len(),
            total,
        );
    }
    Ok(out)
}

/// First passage containing `answer` verbatim, as character offsets.
pub fn locate_answer(passages: &[String], answer: &str) -> Option<AnswerSpan> {
    if answer.is_empty() {
        return None;
    }
    passages.iter().enumerate().find_map(|(passage_id, passage)| {
        passage.find(answer).map(|byte_start| {
            let start = passage[..byte_start].chars().count();
            AnswerSpan { passage_id, start, end: start + answer.chars().count() }
        })
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::{CorpusRow, LabelRef};
    use std::fs;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn rows(builder: &Hulu, root: &Path, split: Split) -> Vec<CorpusRow> {
        builder.parse(root, split).unwrap().collect::<Result<_>>().unwrap()
    }

    #[test]
    fn test_sst_labels_and_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/sst_train.json", r#"[
            {"Sent_id": "sst_train_4", "Sent": "Jó film.", "Label": "positive"},
            {"Sent_id": "sst_train_9", "Sent": "Unalmas.", "Label": "negative"},
            {"Sent_id": "sst_train_11", "Sent": "Film.", "Label": "neutral"}
        ]"#);
        write(dir.path(), "data/sst_test.json", r#"[
            {"Sent_id": "sst_test_1", "Sent": "Ismeretlen."}
        ]"#);

        let sst   = Hulu::new(HuluTask::Sst2);
        let train = rows(&sst, dir.path(), Split::Train);
        let labels: Vec<_> = train.iter().map(|r| r.label("labels")).collect();
        assert_eq!(
            labels,
            vec![Some(LabelRef::Class(2)), Some(LabelRef::Class(0)), Some(LabelRef::Class(1))]
        );
        assert_eq!(train[0].idx, 4);

        let test = rows(&sst, dir.path(), Split::Test);
        assert_eq!(test[0].label("labels"), Some(LabelRef::Class(UNKNOWN_LABEL)));
    }

    #[test]
    fn test_unknown_sentiment_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/sst_dev.json", r#"[
            {"Sent_id": "sst_dev_1", "Sent": "?", "Label": "mixed"}
        ]"#);
        let err = Hulu::new(HuluTask::Sst2).parse(dir.path(), Split::Validation).err();
        assert!(matches!(err, Some(HuevalError::Parse { .. })));
    }

    #[test]
    fn test_cola_string_labels() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/cola_train.json", r#"{"data": [
            {"Sent_id": "hucola_train_7", "Sent": "A kutya ugat.", "Label": "1"},
            {"Sent_id": "hucola_train_8", "Sent": "Ugat kutya a.", "Label": 0}
        ]}"#);
        let train = rows(&Hulu::new(HuluTask::Cola), dir.path(), Split::Train);
        assert_eq!(train[0].label("labels"), Some(LabelRef::Class(1)));
        assert_eq!(train[1].label("labels"), Some(LabelRef::Class(0)));
        assert_eq!(train[1].idx, 8);
    }

    #[test]
    fn test_wnli_bom_and_wrapped_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/train.json",
            "\u{feff}[{\"id\": \"3\", \"sentence1\": \"a\", \"sentence2\": \"b\", \"label\": \"1\"}]");
        write(dir.path(), "data/dev.json",
            "\u{feff}{\"data\": [{\"id\": 5, \"sentence1\": \"c\", \"sentence2\": \"d\", \"label\": 0}]}");

        let wnli = Hulu::new(HuluTask::Wnli);
        let train = rows(&wnli, dir.path(), Split::Train);
        assert_eq!(train[0].text("sentence2"), Some("b"));
        assert_eq!(train[0].label("labels"), Some(LabelRef::Class(1)));

        let dev = rows(&wnli, dir.path(), Split::Validation);
        assert_eq!(dev[0].idx, 5);
    }

    #[test]
    fn test_copa_labels_become_zero_based() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/train.json", r#"[
            {"idx": 1, "premise": "Esett az eső.", "question": "effect",
             "choice1": "Vizes lett a fű.", "choice2": "Kisütött a nap.", "label": "1"}
        ]"#);
        let train = rows(&Hulu::new(HuluTask::Copa), dir.path(), Split::Train);
        assert_eq!(train[0].label("labels"), Some(LabelRef::Class(0)));
        assert_eq!(train[0].text("choice2"), Some("Kisütött a nap."));
    }

    #[test]
    fn test_ws_resplit_partitions_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows_json: Vec<String> = (0..40)
            .map(|i| format!(
                r#"{{"ID": "{i}", "Question": "Ki?", "Sent": "Mondat {i}.", "Answer1": "A", "Answer2": "B", "CorrectAnswer": "{}"}}"#,
                if i % 2 == 0 { "A" } else { "B" }
            ))
            .collect();
        write(dir.path(), "huws.json", &format!("[{}]", rows_json.join(",")));

        let ws = Hulu::new(HuluTask::Ws);
        let mut ids: Vec<i64> = Vec::new();
        let mut sizes = Vec::new();
        for split in Split::ALL {
            let split_rows = rows(&ws, dir.path(), split);
            sizes.push(split_rows.len());
            for row in &split_rows {
                let expected = if row.idx % 2 == 0 { 0 } else { 1 };
                assert_eq!(row.label("labels"), Some(LabelRef::Class(expected)));
            }
            ids.extend(split_rows.iter().map(|r| r.idx));
        }
        assert_eq!(sizes, vec![28, 4, 8]);
        ids.sort_unstable();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_rc_span_search_and_skip() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hurc_train.json", r#"[
            {"id": 1, "lead": ["Bevezető."], "passage": ["Első bekezdés.", "Ágnes Budapesten él."],
             "query": "Hol él @placeholder?", "MASK": "Budapesten"},
            {"id": 2, "lead": ["L."], "passage": ["Semmi."], "query": "?", "MASK": "Szeged"}
        ]"#);

        let train = rows(&Hulu::new(HuluTask::Rc), dir.path(), Split::Train);
        assert_eq!(train.len(), 1);
        assert_eq!(train[0].key, 0);
        match &train[0].body {
            RowBody::Passage(p) => {
                assert_eq!(p.lead, "Bevezető.");
                assert_eq!(p.span, Some(AnswerSpan { passage_id: 1, start: 6, end: 16 }));
            }
            other => panic!("unexpected row {other:?}"),
        }
    }

    #[test]
    fn test_locate_answer_uses_character_offsets() {
        let passages = vec!["Ők és ők.".to_string(), "Árvíztűrő tükörfúrógép".to_string()];
        let span = locate_answer(&passages, "tükörfúrógép").unwrap();
        assert_eq!(span, AnswerSpan { passage_id: 1, start: 10, end: 22 });
        assert_eq!(locate_answer(&passages, ""), None);
    }
}
