// ============================================================
// Layer 4 — OpinHuBank Builder
// ============================================================
// Entity-level opinion polarity, five annotators per mention.
//
// The archive is served only after a licence form is submitted,
// so the download is a POST. The CSV inside is ISO-8859-2:
//
//   col 0     col 1  col 2  col 3   col 4     col 5  col 6..=10
//   <id>      start  len    entity  sentence  url    annotator scores
//
// Scores are -1/0/+1 and are shifted to 0/1/2. The gold label is
// the majority vote; a tie between two classes falls back to
// neutral. The corpus has no native split and is re-split with
// the shared 80/(0.7·n)/20 routine.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::builder::{keyed_vec, CorpusBuilder, RowStream};
use crate::data::splitter::{split_three_way, SPLIT_SEED};
use crate::domain::{
    corpus::Split,
    labels::{ClassLabel, Features},
    row::{OpinionTarget, RowBody},
};
use crate::error::{HuevalError, Result};
use crate::infra::download::Fetcher;

const SOURCE_URL: &str = "https://metashare.nytud.hu/repository/download/608756be64e211e2aa7c68b599c26a068dd5b3551f024f6281131670412d37d3/";

const LICENCE_FORM: [(&str, &str); 3] = [
    ("licence_agree", "on"),
    ("in_licence_agree_form", "True"),
    ("licence", "CC-BY"),
];

pub const CSV_FILE: &str = "OpinHuBank_20130106.csv";

pub const POLARITIES: [&str; 3] = ["negative", "neutral", "positive"];

/// Index of "neutral" in POLARITIES.
pub const NEUTRAL: i64 = 1;

const ANNOTATOR_COLUMNS: std::ops::RangeInclusive<usize> = 6..=10;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpinHuBank;

impl CorpusBuilder for OpinHuBank {
    fn dataset(&self) -> &'static str {
        "opinhubank"
    }

    fn config(&self) -> &'static str {
        "opinhubank"
    }

    fn features(&self) -> Features {
        Features::new()
            .with_label("label", ClassLabel::new(POLARITIES))
            .with_label("annotators", ClassLabel::new(POLARITIES))
    }

    fn download(&self, fetcher: &Fetcher) -> Result<PathBuf> {
        let archive = fetcher.fetch_form(SOURCE_URL, &LICENCE_FORM, "opinhubank/opinhubank.zip")?;
        fetcher.extract_zip(&archive)
    }

    fn parse(&self, root: &Path, split: Split) -> Result<RowStream> {
        let targets = read_targets(&root.join(CSV_FILE))?;
        let parts   = split_three_way(targets, SPLIT_SEED);
        let rows    = match split {
            Split::Train      => parts.train,
            Split::Validation => parts.validation,
            Split::Test       => parts.test,
        };
        Ok(keyed_vec(rows))
    }
}

/// Every annotated mention of the CSV, in file order.
pub fn read_targets(path: &Path) -> Result<Vec<(i64, RowBody)>> {
    let source = path.display().to_string();
    let bytes  = fs::read(path).map_err(|e| HuevalError::parse(&source, e.to_string()))?;
    let (text, _, had_errors) = encoding_rs::ISO_8859_2.decode(&bytes);
    if had_errors {
        tracing::warn!("{}: undecodable bytes replaced", source);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record   = record?;
        // the header is record 0
        let idx      = n as i64 + 1;
        let location = format!("{source} record {idx}");
        let field    = |i: usize| {
            record
                .get(i)
                .ok_or_else(|| HuevalError::parse(&location, format!("missing column {i}")))
        };
        let int = |i: usize| -> Result<i64> {
            let raw = field(i)?;
            raw.trim()
                .parse()
                .map_err(|_| HuevalError::parse(&location, format!("column {i}: '{raw}' is not an integer")))
        };

        let annotators = ANNOTATOR_COLUMNS
            .map(|i| {
                let score = int(i)? + 1;
                if (0..POLARITIES.len() as i64).contains(&score) {
                    Ok(score)
                } else {
                    Err(HuevalError::parse(&location, format!("annotator score {} out of range", score - 1)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        rows.push((idx, RowBody::Opinion(OpinionTarget {
            start:    int(1)?,
            len:      int(2)?,
            entity:   field(3)?.to_string(),
            sentence: field(4)?.to_string(),
            url:      field(5)?.to_string(),
            label:    majority_vote(&annotators),
            annotators,
        })));
    }

    tracing::debug!("{}: {} annotated mentions", source, rows.len());
    Ok(rows)
}

/// Most frequent label; a tie for the top count resolves to neutral.
pub fn majority_vote(labels: &[i64]) -> i64 {
    let mut counts = [0usize; POLARITIES.len()];
    for &label in labels {
        if let Some(c) = usize::try_from(label).ok().and_then(|l| counts.get_mut(l)) {
            *c += 1;
        }
    }

    let top     = counts.iter().copied().max().unwrap_or(0);
    let winners: Vec<usize> = (0..counts.len()).filter(|&i| counts[i] == top).collect();
    match winners.as_slice() {
        [single] if top > 0 => *single as i64,
        _ => NEUTRAL,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::{CorpusRow, LabelRef};

    #[test]
    fn test_clear_majority() {
        assert_eq!(majority_vote(&[2, 2, 2, 1, 0]), 2);
        assert_eq!(majority_vote(&[0, 0, 0, 0, 1]), 0);
    }

    #[test]
    fn test_two_two_tie_is_neutral() {
        assert_eq!(majority_vote(&[0, 0, 2, 2, 1]), NEUTRAL);
        assert_eq!(majority_vote(&[2, 0, 2, 0, 1]), NEUTRAL);
        assert_eq!(majority_vote(&[0, 1, 1, 0, 2]), NEUTRAL);
    }

    fn write_csv(dir: &Path, lines: &[String]) {
        let mut body = String::from("id,start,len,entity,sentence,url,a1,a2,a3,a4,a5\n");
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        let (encoded, _, _) = encoding_rs::ISO_8859_2.encode(&body);
        fs::write(dir.join(CSV_FILE), encoded).unwrap();
    }

    #[test]
    fn test_csv_is_decoded_as_latin2() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), &[
            r#"1,0,5,Orbán,"Orbán Viktor beszélt, őszintén.",http://x.hu,1,1,0,1,-1"#.to_string(),
        ]);

        let rows = read_targets(&dir.path().join(CSV_FILE)).unwrap();
        let (idx, body) = &rows[0];
        assert_eq!(*idx, 1);
        match body {
            RowBody::Opinion(o) => {
                assert_eq!(o.entity, "Orbán");
                assert_eq!(o.sentence, "Orbán Viktor beszélt, őszintén.");
                assert_eq!(o.annotators, vec![2, 2, 1, 2, 0]);
                assert_eq!(o.label, 2);
                assert_eq!(o.len, 5);
            }
            other => panic!("unexpected row {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_score_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), &["1,0,1,a,b,u,0,0,3,0,0".to_string()]);
        let err = read_targets(&dir.path().join(CSV_FILE)).unwrap_err();
        assert!(matches!(err, HuevalError::Parse { .. }));
    }

    #[test]
    fn test_splits_partition_the_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..20)
            .map(|i| format!("{i},0,1,e{i},s{i},u,0,0,0,1,1"))
            .collect();
        write_csv(dir.path(), &lines);

        let mut seen = Vec::new();
        for split in Split::ALL {
            let rows: Vec<CorpusRow> = OpinHuBank
                .parse(dir.path(), split)
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
            for (key, row) in rows.iter().enumerate() {
                assert_eq!(row.key, key);
                assert_eq!(row.label("label"), Some(LabelRef::Class(1)));
            }
            seen.extend(rows.iter().map(|r| r.idx));
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
    }
}
