// ============================================================
// Layer 4 — NerKor Builder
// ============================================================
// NYTK-NerKor: Hungarian NER corpus with morphological layers.
//
// Layout of the pinned repository archive:
//
//   data/train-devel-test/{train,devel,test}/<genre>/<annotation>/
//       <pointer file>   ← first line: relative path of a data file
//
// Data files: FORM LEMMA UPOS XPOS FEATS NER, tab-separated.
// Rows keep one running index across all files of a split.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::builder::{keyed, CorpusBuilder, RowStream};
use crate::data::conll::{self, present, Sentence};
use crate::domain::{
    corpus::Split,
    labels::{ClassLabel, Features},
    row::{RowBody, TaggedSentence, UNKNOWN_LABEL},
};
use crate::error::{HuevalError, Result};
use crate::infra::download::{archive_root, Fetcher};

const SOURCE_URL: &str =
    "https://github.com/nytud/NYTK-NerKor/archive/36a9aefd37e1a77fb8671375def0a5ad343d5dc3.zip";

/// Genre subsets shared by NerKor and NerKor 1.41e.
pub const GENRES: [&str; 5] = ["fiction", "legal", "news", "web", "wikipedia"];

pub const NER_TAGS: [&str; 4] = ["PER", "ORG", "LOC", "MISC"];

pub const UPOS_TAGS: [&str; 17] = [
    "ADJ", "ADP", "ADV", "AUX", "CCONJ", "DET", "INTJ", "NOUN", "NUM",
    "PART", "PRON", "PROPN", "PUNCT", "SCONJ", "SYM", "VERB", "X",
];

const FORM:  usize = 0;
const LEMMA: usize = 1;
const UPOS:  usize = 2;
const XPOS:  usize = 3;
const FEATS: usize = 4;
const NER:   usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct NerKor {
    genre: &'static str,
}

impl NerKor {
    pub fn new(genre: &'static str) -> Self {
        Self { genre }
    }

    fn split_dir(split: Split) -> &'static str {
        match split {
            Split::Train      => "data/train-devel-test/train",
            Split::Validation => "data/train-devel-test/devel",
            Split::Test       => "data/train-devel-test/test",
        }
    }

    /// Data files of a split, resolved through the pointer files.
    pub fn data_files(&self, root: &Path, split: Split) -> Result<Vec<PathBuf>> {
        let base = root.join(Self::split_dir(split)).join(self.genre);
        let mut files = Vec::new();

        for annotation in sorted_entries(&base)? {
            if !annotation.is_dir() {
                continue;
            }
            for pointer in sorted_entries(&annotation)? {
                let target = fs::read_to_string(&pointer)?;
                let target = target.lines().next().map(str::trim).unwrap_or_default();
                if target.is_empty() {
                    return Err(HuevalError::parse(
                        pointer.display().to_string(),
                        "empty pointer file",
                    ));
                }
                files.push(annotation.join(target));
            }
        }

        tracing::debug!("nerkor/{} {}: {} data files", self.genre, split, files.len());
        Ok(files)
    }
}

impl CorpusBuilder for NerKor {
    fn dataset(&self) -> &'static str {
        "nytk-nerkor"
    }

    fn config(&self) -> &'static str {
        self.genre
    }

    fn features(&self) -> Features {
        Features::new()
            .with_label("ner", ClassLabel::bio(&NER_TAGS))
            .with_label("upos", ClassLabel::new(UPOS_TAGS))
    }

    fn download(&self, fetcher: &Fetcher) -> Result<PathBuf> {
        let archive = fetcher.fetch(SOURCE_URL, "nerkor/nytk-nerkor.zip")?;
        let dir     = fetcher.extract_zip(&archive)?;
        archive_root(&dir)
    }

    fn parse(&self, root: &Path, split: Split) -> Result<RowStream> {
        let files = self.data_files(root, split)?;
        let ner   = ClassLabel::bio(&NER_TAGS);
        let upos  = ClassLabel::new(UPOS_TAGS);

        let rows = conll::read_files(files)
            .enumerate()
            .map(move |(n, sentence)| {
                let body = tagged_sentence(&sentence?, &ner, &upos)?;
                Ok((n as i64, RowBody::Tagged(body)))
            });
        Ok(keyed(rows))
    }
}

fn tagged_sentence(sentence: &Sentence, ner: &ClassLabel, upos: &ClassLabel) -> Result<TaggedSentence> {
    let source = sentence.file.display().to_string();
    let encode = |label: &ClassLabel, field: &str| match present(field) {
        Some(name) => label.encode(name, &source),
        None       => Ok(UNKNOWN_LABEL),
    };

    // NER is the last column, so its presence proves every other column is there
    let ner_tags = sentence.column(NER)?;

    Ok(TaggedSentence {
        text:   sentence.text(),
        tokens: sentence.column(FORM)?.into_iter().map(str::to_string).collect(),
        lemmas: sentence.column(LEMMA)?.into_iter().map(str::to_string).collect(),
        upos: sentence
            .column(UPOS)?
            .into_iter()
            .map(|f| encode(upos, f))
            .collect::<Result<_>>()?,
        xpos: sentence
            .column(XPOS)?
            .into_iter()
            .map(|f| present(f).map(str::to_string))
            .collect(),
        feats: sentence
            .column(FEATS)?
            .into_iter()
            .map(|f| present(f).map(str::to_string))
            .collect(),
        ner: ner_tags
            .into_iter()
            .map(|f| encode(ner, f))
            .collect::<Result<_>>()?,
        file_name:    provenance(&sentence.file, 3),
        sentence_id:  sentence.sentence_id,
        morph_tagged: parent_dir_name(&sentence.file) == Some("morph"),
    })
}

/// Last `depth` components of a path, joined with '/'.
pub fn provenance(path: &Path, depth: usize) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts[parts.len().saturating_sub(depth)..].join("/")
}

fn parent_dir_name(path: &Path) -> Option<&str> {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
}

/// Directory entries in name order, so row order does not depend on the filesystem.
pub fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| HuevalError::parse(dir.display().to_string(), e.to_string()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
