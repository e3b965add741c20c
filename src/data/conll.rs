// ============================================================
// Layer 4 — CoNLL-style Sentence Reader
// ============================================================
// Tab-separated token files, one token per line, sentences
// separated by blank lines:
//
//   FORM     LEMMA   UPOS   ...        ← header, skipped
//   A        a       DET    ...
//   kutya    kutya   NOUN   ...
//                                      ← sentence boundary
//   Ugat     ugat    VERB   ...
//
// Files are read lazily, one sentence at a time. A trailing
// sentence without a closing blank line is still emitted.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    iter,
    path::{Path, PathBuf},
};

use crate::error::{HuevalError, Result};

/// Marker for an absent annotation.
pub const ABSENT: &str = "_";

/// One sentence of a token file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub file:        PathBuf,
    /// Zero-based position inside its file
    pub sentence_id: usize,
    /// Line number (1-based) of the first token
    pub line:        usize,
    /// Tab-separated fields of every token line
    pub tokens:      Vec<Vec<String>>,
}

impl Sentence {
    /// Field `column` of every token; errors when a line is too short.
    pub fn column(&self, column: usize) -> Result<Vec<&str>> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(offset, fields)| {
                fields.get(column).map(String::as_str).ok_or_else(|| {
                    HuevalError::parse(
                        format!("{}:{}", self.file.display(), self.line + offset),
                        format!("expected at least {} columns, found {}", column + 1, fields.len()),
                    )
                })
            })
            .collect()
    }

    /// Surface text: the first column joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|f| f.first().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Iterator over the sentences of one file.
pub struct SentenceReader {
    path:        PathBuf,
    lines:       Lines<BufReader<File>>,
    line_no:     usize,
    sentence_id: usize,
}

impl SentenceReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| HuevalError::parse(path.display().to_string(), e.to_string()))?;
        let mut lines = BufReader::new(file).lines();

        // header
        if let Some(header) = lines.next() {
            header.map_err(|e| HuevalError::parse(path.display().to_string(), e.to_string()))?;
        }

        Ok(Self {
            path:        path.to_path_buf(),
            lines,
            line_no:     1,
            sentence_id: 0,
        })
    }
}

impl Iterator for SentenceReader {
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut tokens = Vec::new();
        let mut first  = 0;

        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(HuevalError::parse(
                        format!("{}:{}", self.path.display(), self.line_no),
                        e.to_string(),
                    )))
                }
            };
            let line = line.trim_end_matches(['\r', '\n']);

            if line.trim().is_empty() {
                if tokens.is_empty() {
                    continue;
                }
                break;
            }

            if tokens.is_empty() {
                first = self.line_no;
            }
            tokens.push(line.split('\t').map(str::to_string).collect::<Vec<_>>());
        }

        if tokens.is_empty() {
            return None;
        }

        let sentence = Sentence {
            file: self.path.clone(),
            sentence_id: self.sentence_id,
            line: first,
            tokens,
        };
        self.sentence_id += 1;
        Some(Ok(sentence))
    }
}

/// Sentences of several files in order, opening each file only when
/// the previous one is exhausted.
pub fn read_files(files: Vec<PathBuf>) -> impl Iterator<Item = Result<Sentence>> {
    files.into_iter().flat_map(|path| -> Box<dyn Iterator<Item = Result<Sentence>>> {
        tracing::debug!("Reading {}", path.display());
        match SentenceReader::open(&path) {
            Ok(reader) => Box::new(reader),
            Err(e)     => Box::new(iter::once(Err(e))),
        }
    })
}

/// `None` for the absent-annotation marker.
pub fn present(field: &str) -> Option<&str> {
    let field = field.trim();
    (field != ABSENT).then_some(field)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_blank_lines_split_sentences_and_header_is_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "a.tsv",
            "form\tner\nA\tO\nkutya\tO\n\n\nUgat\tO\n.\tO\n\n");

        let sentences: Vec<Sentence> =
            SentenceReader::open(&path).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text(), "A kutya");
        assert_eq!(sentences[0].line, 2);
        assert_eq!(sentences[1].sentence_id, 1);
        assert_eq!(sentences[1].line, 6);
    }

    #[test]
    fn test_trailing_sentence_without_blank_line() {
        let dir  = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "b.tsv", "form\tner\nBudapest\tB-LOC");
        let sentences: Vec<Sentence> =
            SentenceReader::open(&path).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].column(1).unwrap(), vec!["B-LOC"]);
    }

    #[test]
    fn test_short_line_reports_location() {
        let dir  = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "c.tsv", "form\tner\nA\tO\nkutya\n");
        let sentence = SentenceReader::open(&path).unwrap().next().unwrap().unwrap();
        let err = sentence.column(1).unwrap_err().to_string();
        assert!(err.contains("c.tsv:3"), "{err}");
    }

    #[test]
    fn test_sentence_ids_restart_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let a   = fixture(dir.path(), "a.tsv", "h\nx\n\ny\n\n");
        let b   = fixture(dir.path(), "b.tsv", "h\nz\n\n");
        let ids: Vec<(String, usize)> = read_files(vec![a, b])
            .map(|s| s.map(|s| (s.text(), s.sentence_id)))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(ids, vec![("x".into(), 0), ("y".into(), 1), ("z".into(), 0)]);
    }

    #[test]
    fn test_absent_marker() {
        assert_eq!(present("_"), None);
        assert_eq!(present("NOUN"), Some("NOUN"));
    }
}
