// ============================================================
// Layer 5 — Metric Computation
// ============================================================
// Scores predictions against gold labels for each MetricId:
//
//   accuracy              matches / total
//   matthews_correlation  multi-class MCC over the confusion matrix
//   seqeval               IOB2 chunk precision / recall / F1
//                         plus token accuracy
//   record                exact match and token F1 over answer text
//
// Inputs are per-example sequences of label ids with ignored
// positions (-100) already removed: one element per example for
// sentence-level tasks, one per scored word for token tasks.
//
// Reference: Matthews (1975); Gorodkin (2004) for the K-class form
//            seqeval / conlleval chunking rules

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::labels::ClassLabel;
use crate::domain::task::MetricId;
use crate::error::{HuevalError, Result};

/// metric name → value, ordered for stable logging and CSV columns
pub type Scores = BTreeMap<String, f64>;

/// Key of the value a run is ranked by.
pub fn headline_key(metric: MetricId) -> &'static str {
    match metric {
        MetricId::Accuracy            => "accuracy",
        MetricId::MatthewsCorrelation => "matthews_correlation",
        MetricId::Seqeval             => "overall_f1",
        MetricId::Record              => "f1",
    }
}

/// Every key a metric reports, in column order.
pub fn score_columns(metric: MetricId) -> &'static [&'static str] {
    match metric {
        MetricId::Accuracy            => &["accuracy"],
        MetricId::MatthewsCorrelation => &["matthews_correlation"],
        MetricId::Seqeval             => &["overall_precision", "overall_recall", "overall_f1", "overall_accuracy"],
        MetricId::Record              => &["exact_match", "f1"],
    }
}

/// Score label-id predictions with the registered metric.
pub fn score(
    metric:      MetricId,
    predictions: &[Vec<i64>],
    references:  &[Vec<i64>],
    label_names: &ClassLabel,
) -> Result<Scores> {
    if predictions.len() != references.len() {
        return Err(HuevalError::Metric(format!(
            "{} predictions for {} references",
            predictions.len(),
            references.len()
        )));
    }
    if let Some(i) = (0..predictions.len()).find(|&i| predictions[i].len() != references[i].len()) {
        return Err(HuevalError::Metric(format!(
            "example {i}: {} predicted labels for {} gold labels",
            predictions[i].len(),
            references[i].len()
        )));
    }

    let flat_pred: Vec<i64> = predictions.iter().flatten().copied().collect();
    let flat_gold: Vec<i64> = references.iter().flatten().copied().collect();

    let mut scores = Scores::new();
    match metric {
        MetricId::Accuracy => {
            scores.insert("accuracy".into(), accuracy(&flat_pred, &flat_gold));
        }
        MetricId::MatthewsCorrelation => {
            scores.insert("matthews_correlation".into(), matthews_correlation(&flat_pred, &flat_gold));
        }
        MetricId::Seqeval => {
            let to_tags = |seqs: &[Vec<i64>]| -> Result<Vec<Vec<String>>> {
                seqs.iter()
                    .map(|seq| seq.iter().map(|&id| tag_name(label_names, id)).collect())
                    .collect()
            };
            let chunk = seqeval(&to_tags(predictions)?, &to_tags(references)?);
            scores.insert("overall_precision".into(), chunk.precision);
            scores.insert("overall_recall".into(),    chunk.recall);
            scores.insert("overall_f1".into(),        chunk.f1);
            scores.insert("overall_accuracy".into(),  accuracy(&flat_pred, &flat_gold));
        }
        MetricId::Record => {
            return Err(HuevalError::Metric(
                "record scores answer strings, not label ids".into(),
            ));
        }
    }
    Ok(scores)
}

fn tag_name(label_names: &ClassLabel, id: i64) -> Result<String> {
    label_names
        .name(id)
        .map(str::to_string)
        .ok_or_else(|| HuevalError::Metric(format!("label id {id} outside the vocabulary")))
}

pub fn accuracy(predictions: &[i64], references: &[i64]) -> f64 {
    if references.is_empty() {
        return 0.0;
    }
    let correct = predictions.iter().zip(references).filter(|(p, g)| p == g).count();
    correct as f64 / references.len() as f64
}

/// K-class Matthews correlation; 0 when either marginal is constant.
pub fn matthews_correlation(predictions: &[i64], references: &[i64]) -> f64 {
    let mut true_counts: HashMap<i64, f64> = HashMap::new();
    let mut pred_counts: HashMap<i64, f64> = HashMap::new();
    let mut correct = 0.0;
    for (&p, &g) in predictions.iter().zip(references) {
        *pred_counts.entry(p).or_default() += 1.0;
        *true_counts.entry(g).or_default() += 1.0;
        if p == g {
            correct += 1.0;
        }
    }
    let total = references.len() as f64;

    let cov_pred_true: f64 = pred_counts
        .iter()
        .map(|(k, p)| p * true_counts.get(k).copied().unwrap_or(0.0))
        .sum();
    let sum_sq = |counts: &HashMap<i64, f64>| counts.values().map(|c| c * c).sum::<f64>();

    let numerator   = correct * total - cov_pred_true;
    let denominator = ((total * total - sum_sq(&pred_counts)) * (total * total - sum_sq(&true_counts))).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

// ─── seqeval ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkScores {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

/// (sentence, type, first token, last token)
type Chunk = (usize, String, usize, usize);

/// Decode IOB2 chunks. An I- tag that does not continue a chunk of
/// its type opens a new one; a bare tag is a one-token chunk.
pub fn chunks(sentence: usize, tags: &[String]) -> Vec<Chunk> {
    let mut found = Vec::new();
    let mut open: Option<(String, usize)> = None;

    let close = |open: &mut Option<(String, usize)>, end: usize, found: &mut Vec<Chunk>| {
        if let Some((kind, start)) = open.take() {
            found.push((sentence, kind, start, end));
        }
    };

    for (i, tag) in tags.iter().enumerate() {
        if tag == "O" {
            close(&mut open, i.saturating_sub(1), &mut found);
            continue;
        }
        match tag.split_once('-') {
            Some(("B", kind)) => {
                close(&mut open, i.saturating_sub(1), &mut found);
                open = Some((kind.to_string(), i));
            }
            Some(("I", kind)) => {
                let continues = open.as_ref().is_some_and(|(k, _)| k == kind);
                if !continues {
                    close(&mut open, i.saturating_sub(1), &mut found);
                    open = Some((kind.to_string(), i));
                }
            }
            _ => {
                close(&mut open, i.saturating_sub(1), &mut found);
                found.push((sentence, tag.clone(), i, i));
            }
        }
    }
    close(&mut open, tags.len().saturating_sub(1), &mut found);
    found
}

/// Micro-averaged chunk precision / recall / F1.
pub fn seqeval(predictions: &[Vec<String>], references: &[Vec<String>]) -> ChunkScores {
    let predicted: HashSet<Chunk> = predictions
        .iter()
        .enumerate()
        .flat_map(|(i, tags)| chunks(i, tags))
        .collect();
    let gold: HashSet<Chunk> = references
        .iter()
        .enumerate()
        .flat_map(|(i, tags)| chunks(i, tags))
        .collect();

    let correct   = predicted.intersection(&gold).count() as f64;
    let precision = if predicted.is_empty() { 0.0 } else { correct / predicted.len() as f64 };
    let recall    = if gold.is_empty()      { 0.0 } else { correct / gold.len() as f64 };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ChunkScores { precision, recall, f1 }
}

// ─── ReCoRD ───────────────────────────────────────────────────────────────────
/// Lower-case, drop punctuation, collapse whitespace.
pub fn normalize_answer(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_f1(prediction: &str, gold: &str) -> f64 {
    let pred_tokens: Vec<&str> = prediction.split_whitespace().collect();
    let gold_tokens: Vec<&str> = gold.split_whitespace().collect();

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for t in &gold_tokens {
        *gold_counts.entry(t).or_default() += 1;
    }
    let mut common = 0usize;
    for t in &pred_tokens {
        if let Some(n) = gold_counts.get_mut(t) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }
    let precision = common as f64 / pred_tokens.len() as f64;
    let recall    = common as f64 / gold_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Exact match and token F1, each the best over an example's gold answers.
pub fn record_scores(predictions: &[String], answers: &[Vec<String>]) -> Result<Scores> {
    if predictions.len() != answers.len() {
        return Err(HuevalError::Metric(format!(
            "{} predictions for {} answer sets",
            predictions.len(),
            answers.len()
        )));
    }
    let (mut em_total, mut f1_total) = (0.0, 0.0);
    for (prediction, golds) in predictions.iter().zip(answers) {
        let pred = normalize_answer(prediction);
        let best = |f: &dyn Fn(&str) -> f64| {
            golds.iter().map(|g| f(&normalize_answer(g))).fold(0.0_f64, f64::max)
        };
        em_total += best(&|g| if g == pred { 1.0 } else { 0.0 });
        f1_total += best(&|g| token_f1(&pred, g));
    }

    let n = predictions.len().max(1) as f64;
    let mut scores = Scores::new();
    scores.insert("exact_match".into(), em_total / n);
    scores.insert("f1".into(),          f1_total / n);
    Ok(scores)
}
