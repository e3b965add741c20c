// ============================================================
// Layer 4 — Corpus Builder Abstraction
// ============================================================
// One builder per (corpus family, configuration). A builder
// knows two things:
//
//   download() → where the raw files end up on disk
//   parse()    → how to turn those files into CorpusRows
//
// parse() returns a fresh iterator on every call, so a split
// can be re-read from disk as often as needed.

use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    corpus::Split,
    labels::Features,
    row::{CorpusRow, RowBody},
};
use crate::error::{HuevalError, Result};
use crate::infra::download::Fetcher;

/// Lazily produced rows of one split.
pub type RowStream = Box<dyn Iterator<Item = Result<CorpusRow>>>;

pub trait CorpusBuilder: Send + Sync {
    /// Registry name of the corpus family, e.g. "hulu"
    fn dataset(&self) -> &'static str;

    /// Configuration name, e.g. "sst2"
    fn config(&self) -> &'static str;

    /// Label vocabularies every split of this configuration records.
    fn features(&self) -> Features;

    /// Fetch (or find in the cache) the raw files; returns their root.
    fn download(&self, fetcher: &Fetcher) -> Result<PathBuf>;

    /// Rows of one split, read from a root returned by `download`.
    fn parse(&self, root: &Path, split: Split) -> Result<RowStream>;
}

/// Number rows of a split from zero in the order they are produced.
pub fn keyed<I>(rows: I) -> RowStream
where
    I: Iterator<Item = Result<(i64, RowBody)>> + 'static,
{
    Box::new(
        rows.enumerate()
            .map(|(key, row)| row.map(|(idx, body)| CorpusRow::new(key, idx, body))),
    )
}

/// Number an already materialised list of rows.
pub fn keyed_vec(rows: Vec<(i64, RowBody)>) -> RowStream {
    keyed(rows.into_iter().map(Ok))
}

/// Deserialize a JSON file, tolerating a UTF-8 byte-order mark.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| HuevalError::parse(path.display().to_string(), e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    serde_json::from_str(text)
        .map_err(|e| HuevalError::parse(path.display().to_string(), e.to_string()))
}

/// Integer carried either as a JSON number or as a numeric string.
pub fn json_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric suffix of identifiers like "hucola_train_123".
pub fn id_suffix(id: &str) -> Option<i64> {
    id.rsplit('_').next().and_then(|n| n.trim().parse().ok())
}
