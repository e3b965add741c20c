// ============================================================
// Layer 4 — NerKor 1.41e Builder
// ============================================================
// NerKor re-annotated with the OntoNotes++ entity inventory.
// Two columns per token (FORM, NER). Every split file lives
// directly under data/ and is selected by name:
//
//   <genre> ∈ file name  and  <split key> ∈ file name
//
// where the split key is "train", "devel" or "test".

use std::path::{Path, PathBuf};

use crate::data::builder::{keyed, CorpusBuilder, RowStream};
use crate::data::conll::{self, present, Sentence};
use crate::data::nerkor::{provenance, sorted_entries};
use crate::domain::{
    corpus::Split,
    labels::{ClassLabel, Features},
    row::{RowBody, TaggedSentence, UNKNOWN_LABEL},
};
use crate::error::Result;
use crate::infra::download::{archive_root, Fetcher};

const SOURCE_URL: &str = "https://github.com/novakat/NYTK-NerKor-Cars-OntoNotesPP/archive/eb94fc3c22ed27589593716e150d73e060e2333d.zip";

/// OntoNotes++ entity types.
pub const ONPP_TAGS: [&str; 31] = [
    "PER", "FAC", "ORG", "GPE", "LOC", "PROD", "EVENT", "WORK_OF_ART", "LAW",
    "NORP", "LANGUAGE", "DATE", "TIME", "PERCENT", "MONEY", "QUANTITY",
    "ORDINAL", "CARDINAL", "AWARD", "CAR", "MEDIA", "SMEDIA", "ORG-GPE",
    "PROJ", "MISC", "MISC-ORG", "MISC-PER", "MISC-LOC", "DUR", "ID", "AGE",
];

#[derive(Debug, Clone, Copy)]
pub struct NerKorExtended {
    genre: &'static str,
}

impl NerKorExtended {
    pub fn new(genre: &'static str) -> Self {
        Self { genre }
    }

    fn split_key(split: Split) -> &'static str {
        match split {
            Split::Train      => "train",
            Split::Validation => "devel",
            Split::Test       => "test",
        }
    }

    pub fn data_files(&self, root: &Path, split: Split) -> Result<Vec<PathBuf>> {
        let key = Self::split_key(split);
        let files: Vec<PathBuf> = sorted_entries(&root.join("data"))?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.contains(key) && name.contains(self.genre))
            })
            .collect();

        tracing::debug!("nerkor_1.41e/{} {}: {} data files", self.genre, split, files.len());
        Ok(files)
    }
}

impl CorpusBuilder for NerKorExtended {
    fn dataset(&self) -> &'static str {
        "nerkor_1.41e"
    }

    fn config(&self) -> &'static str {
        self.genre
    }

    fn features(&self) -> Features {
        Features::new().with_label("ner", ClassLabel::bio(&ONPP_TAGS))
    }

    fn download(&self, fetcher: &Fetcher) -> Result<PathBuf> {
        let archive = fetcher.fetch(SOURCE_URL, "nerkor/nerkor-1.41e.zip")?;
        let dir     = fetcher.extract_zip(&archive)?;
        archive_root(&dir)
    }

    fn parse(&self, root: &Path, split: Split) -> Result<RowStream> {
        let files = self.data_files(root, split)?;
        let ner   = ClassLabel::bio(&ONPP_TAGS);

        let rows = conll::read_files(files)
            .enumerate()
            .map(move |(n, sentence)| {
                let body = tagged_sentence(&sentence?, &ner)?;
                Ok((n as i64, RowBody::Tagged(body)))
            });
        Ok(keyed(rows))
    }
}

fn tagged_sentence(sentence: &Sentence, ner: &ClassLabel) -> Result<TaggedSentence> {
    let source    = sentence.file.display().to_string();
    let file_name = provenance(&sentence.file, 1);

    let tags = sentence
        .column(1)?
        .into_iter()
        .map(|field| match present(field) {
            Some(name) => ner.encode(name, &source),
            None       => Ok(UNKNOWN_LABEL),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TaggedSentence {
        text:         sentence.text(),
        tokens:       sentence.column(0)?.into_iter().map(str::to_string).collect(),
        ner:          tags,
        morph_tagged: !file_name.contains("no-morph"),
        file_name,
        sentence_id:  sentence.sentence_id,
        ..TaggedSentence::default()
    })
}
