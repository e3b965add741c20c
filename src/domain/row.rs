// ============================================================
// Layer 3 — Corpus Rows
// ============================================================
// A CorpusRow is one record yielded by a builder's parse step.
// It never changes after it is produced.
//
// Every row carries two numbers:
//   - key: zero-based position inside its split (unique per split)
//   - idx: the identifier the upstream corpus assigned
//
// The body holds the raw text columns and labels. Aligners do
// not match on the body directly; they ask for columns by name
// (`text("sentence1")`, `label("ner")`) so the column mapping of
// each configuration stays a static table.

use serde::{Deserialize, Serialize};

/// Label stored on test splits that ship without gold answers.
pub const UNKNOWN_LABEL: i64 = -1;

/// Label assigned to sub-tokens the loss must skip.
pub const IGNORE_INDEX: i64 = -100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub key:  usize,
    pub idx:  i64,
    pub body: RowBody,
}

/// The raw fields of a row, one variant per corpus shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowBody {
    /// cola, sst2
    Sentence { sentence: String, label: i64 },
    /// wnli
    SentencePair { sentence1: String, sentence2: String, label: i64 },
    /// copa, ws: `context` is the premise (copa) or sentence (ws)
    Choice {
        context:  String,
        question: String,
        choices:  Vec<String>,
        label:    i64,
    },
    /// rc
    Passage(PassageQuery),
    /// NerKor and NerKor 1.41e
    Tagged(TaggedSentence),
    /// OpinHuBank
    Opinion(OpinionTarget),
}

/// Reading-comprehension record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageQuery {
    pub lead:     String,
    pub passages: Vec<String>,
    pub query:    String,
    /// Empty on the test split
    pub answer:   String,
    /// None on the test split
    pub span:     Option<AnswerSpan>,
}

/// Character offsets of an answer inside one passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSpan {
    pub passage_id: usize,
    pub start:      usize,
    /// Exclusive
    pub end:        usize,
}

/// One sentence of a CoNLL-style token-level corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedSentence {
    pub text:         String,
    pub tokens:       Vec<String>,
    pub lemmas:       Vec<String>,
    pub upos:         Vec<i64>,
    pub xpos:         Vec<Option<String>>,
    pub feats:        Vec<Option<String>>,
    pub ner:          Vec<i64>,
    pub file_name:    String,
    pub sentence_id:  usize,
    pub morph_tagged: bool,
}

/// OpinHuBank annotation of one entity mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionTarget {
    pub entity:     String,
    pub sentence:   String,
    pub url:        String,
    pub start:      i64,
    pub len:        i64,
    pub annotators: Vec<i64>,
    pub label:      i64,
}

/// Borrowed view of a label column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelRef<'a> {
    Class(i64),
    Sequence(&'a [i64]),
    Answer(&'a str),
}

impl LabelRef<'_> {
    /// True when the value carries no gold information.
    pub fn is_unknown(&self) -> bool {
        match self {
            LabelRef::Class(l)    => *l == UNKNOWN_LABEL,
            LabelRef::Sequence(s) => s.iter().all(|&l| l == UNKNOWN_LABEL),
            LabelRef::Answer(a)   => a.is_empty(),
        }
    }
}

impl CorpusRow {
    pub fn new(key: usize, idx: i64, body: RowBody) -> Self {
        Self { key, idx, body }
    }

    /// Named text column, if this row shape has it.
    pub fn text(&self, column: &str) -> Option<&str> {
        match (&self.body, column) {
            (RowBody::Sentence { sentence, .. }, "sentence") => Some(sentence),
            (RowBody::SentencePair { sentence1, .. }, "sentence1") => Some(sentence1),
            (RowBody::SentencePair { sentence2, .. }, "sentence2") => Some(sentence2),
            (RowBody::Choice { context, .. }, "premise" | "sentence") => Some(context),
            (RowBody::Choice { question, .. }, "question") => Some(question),
            (RowBody::Choice { choices, .. }, name) => choice_index(name)
                .and_then(|i| choices.get(i))
                .map(String::as_str),
            (RowBody::Passage(p), "lead")  => Some(&p.lead),
            (RowBody::Passage(p), "query") => Some(&p.query),
            (RowBody::Tagged(t), "text")      => Some(&t.text),
            (RowBody::Tagged(t), "file_name") => Some(&t.file_name),
            (RowBody::Opinion(o), "entity")   => Some(&o.entity),
            (RowBody::Opinion(o), "sentence") => Some(&o.sentence),
            (RowBody::Opinion(o), "url")      => Some(&o.url),
            _ => None,
        }
    }

    /// Pre-split words of a token-level row.
    pub fn tokens(&self) -> Option<&[String]> {
        match &self.body {
            RowBody::Tagged(t) => Some(&t.tokens),
            _ => None,
        }
    }

    /// Named label column, if this row shape has it.
    pub fn label(&self, column: &str) -> Option<LabelRef<'_>> {
        match (&self.body, column) {
            (RowBody::Sentence { label, .. }, "labels" | "label")
            | (RowBody::SentencePair { label, .. }, "labels" | "label")
            | (RowBody::Choice { label, .. }, "labels" | "label") => Some(LabelRef::Class(*label)),
            (RowBody::Passage(p), "labels" | "answer") => Some(LabelRef::Answer(&p.answer)),
            (RowBody::Tagged(t), "ner")  => Some(LabelRef::Sequence(&t.ner)),
            (RowBody::Tagged(t), "upos") => Some(LabelRef::Sequence(&t.upos)),
            (RowBody::Opinion(o), "label")      => Some(LabelRef::Class(o.label)),
            (RowBody::Opinion(o), "annotators") => Some(LabelRef::Sequence(&o.annotators)),
            _ => None,
        }
    }

    /// Token-level rows only: was the source file morphologically annotated?
    pub fn morph_tagged(&self) -> bool {
        matches!(&self.body, RowBody::Tagged(t) if t.morph_tagged)
    }
}

/// "choice1" → 0, "choice2" → 1, ...
fn choice_index(column: &str) -> Option<usize> {
    column
        .strip_prefix("choice")
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
}
