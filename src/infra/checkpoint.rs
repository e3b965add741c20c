// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Resolves a model identifier to a checkpoint directory on disk
// and persists encoder weights with Burn's CompactRecorder.
//
// Resolution order:
//   1. An existing local directory
//   2. hubert-wiki-cased / hubert-wiki-uncased: tar.gz archive
//      downloaded into the cache, extracted once, config.json
//      patched with "model_type": "bert" when absent
//   3. Anything else: the Hugging Face hub (config.json, then
//      tokenizer.json or vocab.txt)
//
// A checkpoint directory holds:
//   config.json              encoder architecture
//   tokenizer.json | vocab.txt (+ tokenizer_config.json)
//   model.mpk                encoder record (optional)
//
// Files written by a run:
//   <output>/run_config.json  run configuration
//   <output>/model.mpk        trained encoder, plus config.json and
//                             the tokenizer so the directory can be
//                             resolved as a checkpoint again
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{HuevalError, Result};
use crate::infra::download::Fetcher;
use crate::infra::tokenizer_store::TOKENIZER_CONFIG_FILE;
use crate::ml::model::Encoder;

pub const CONFIG_FILE:     &str = "config.json";
pub const TOKENIZER_FILE:  &str = "tokenizer.json";
pub const VOCAB_FILE:      &str = "vocab.txt";
pub const RUN_CONFIG_FILE: &str = "run_config.json";
/// Record name without extension; CompactRecorder appends `.mpk`.
pub const WEIGHTS_STEM:    &str = "model";

/// A HuBERT checkpoint distributed as a tar.gz archive.
#[derive(Debug, Clone, Copy)]
pub struct ArchivedCheckpoint {
    pub name:      &'static str,
    pub url:       &'static str,
    /// Directory inside the archive holding config.json and vocab.txt
    pub prefix:    &'static str,
    pub lowercase: bool,
}

pub const HUBERT_WIKI: [ArchivedCheckpoint; 2] = [
    ArchivedCheckpoint {
        name:      "hubert-wiki-cased",
        url:       "https://nessie.ilab.sztaki.hu/~ndavid/hubert/hubert_wiki.tar.gz",
        prefix:    "hubert_wiki",
        lowercase: false,
    },
    ArchivedCheckpoint {
        name:      "hubert-wiki-uncased",
        url:       "https://nessie.ilab.sztaki.hu/~ndavid/hubert/hubert_wiki_lower.tar.gz",
        prefix:    "hubert_wiki_lower",
        lowercase: true,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSource {
    /// A serialised `tokenizers` tokenizer
    Json(PathBuf),
    /// A BERT vocabulary; a WordPiece tokenizer is built from it
    Vocab(PathBuf),
}

impl TokenizerSource {
    pub fn path(&self) -> &Path {
        match self {
            TokenizerSource::Json(p) | TokenizerSource::Vocab(p) => p,
        }
    }
}

/// Everything needed to build an encoder and its tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCheckpoint {
    pub model:     String,
    pub config:    PathBuf,
    pub tokenizer: TokenizerSource,
    /// Encoder record path without extension, when one exists
    pub weights:   Option<PathBuf>,
    pub lowercase: bool,
}

// ─── Resolution ───────────────────────────────────────────────────────────────
pub struct CheckpointResolver<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> CheckpointResolver<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn resolve(&self, model: &str) -> Result<ResolvedCheckpoint> {
        let local = Path::new(model);
        if local.is_dir() {
            tracing::info!("Using local checkpoint '{}'", local.display());
            return from_dir(model, local, false);
        }

        if let Some(archived) = HUBERT_WIKI.iter().find(|c| c.name == model) {
            return self.resolve_archived(archived);
        }

        self.resolve_hub(model)
    }

    fn resolve_archived(&self, checkpoint: &ArchivedCheckpoint) -> Result<ResolvedCheckpoint> {
        let load_err = |e: HuevalError| HuevalError::model_load(checkpoint.name, e.to_string());

        let archive = self
            .fetcher
            .fetch(checkpoint.url, format!("models/{}.tar.gz", checkpoint.name))
            .map_err(load_err)?;
        let dir = self
            .fetcher
            .extract_tar_gz(&archive)
            .map_err(load_err)?
            .join(checkpoint.prefix);

        patch_model_type(&dir.join(CONFIG_FILE)).map_err(load_err)?;
        from_dir(checkpoint.name, &dir, checkpoint.lowercase)
    }

    fn resolve_hub(&self, model: &str) -> Result<ResolvedCheckpoint> {
        use hf_hub::api::sync::Api;

        let api = Api::new()
            .map_err(|e| HuevalError::model_load(model, format!("HF API: {e}")))?;
        let repo = api.model(model.to_string());

        let config = repo
            .get(CONFIG_FILE)
            .map_err(|e| HuevalError::model_load(model, format!("{CONFIG_FILE}: {e}")))?;
        let tokenizer = match repo.get(TOKENIZER_FILE) {
            Ok(path) => TokenizerSource::Json(path),
            Err(_) => {
                let vocab = repo
                    .get(VOCAB_FILE)
                    .map_err(|e| HuevalError::model_load(model, format!("tokenizer: {e}")))?;
                // lands beside vocab.txt in the snapshot; absent means BERT defaults
                if let Err(e) = repo.get(TOKENIZER_CONFIG_FILE) {
                    tracing::debug!("'{}' has no {}: {}", model, TOKENIZER_CONFIG_FILE, e);
                }
                TokenizerSource::Vocab(vocab)
            }
        };

        tracing::info!("Resolved '{}' from the Hugging Face hub", model);
        Ok(ResolvedCheckpoint {
            model: model.to_string(),
            config,
            tokenizer,
            weights: None,
            lowercase: false,
        })
    }
}

/// Describe a checkpoint directory already on disk.
pub fn from_dir(model: &str, dir: &Path, lowercase: bool) -> Result<ResolvedCheckpoint> {
    let config = dir.join(CONFIG_FILE);
    if !config.is_file() {
        return Err(HuevalError::model_load(
            model,
            format!("no {CONFIG_FILE} in '{}'", dir.display()),
        ));
    }

    let tokenizer = if dir.join(TOKENIZER_FILE).is_file() {
        TokenizerSource::Json(dir.join(TOKENIZER_FILE))
    } else if dir.join(VOCAB_FILE).is_file() {
        TokenizerSource::Vocab(dir.join(VOCAB_FILE))
    } else {
        return Err(HuevalError::model_load(
            model,
            format!("no {TOKENIZER_FILE} or {VOCAB_FILE} in '{}'", dir.display()),
        ));
    };

    let stem    = dir.join(WEIGHTS_STEM);
    let weights = stem.with_extension("mpk").is_file().then_some(stem);

    Ok(ResolvedCheckpoint {
        model: model.to_string(),
        config,
        tokenizer,
        weights,
        lowercase,
    })
}

/// Add `"model_type": "bert"` to a config.json that lacks it.
/// Returns whether the file was rewritten.
pub fn patch_model_type(config_path: &Path) -> Result<bool> {
    let text = fs::read_to_string(config_path)?;
    let mut config: serde_json::Value = serde_json::from_str(&text)?;

    let Some(fields) = config.as_object_mut() else {
        return Err(HuevalError::parse(
            config_path.display().to_string(),
            "config is not a JSON object",
        ));
    };
    if fields.contains_key("model_type") {
        return Ok(false);
    }

    fields.insert("model_type".into(), serde_json::json!("bert"));
    fs::write(config_path, serde_json::to_string_pretty(&config)?)?;
    tracing::debug!("Added model_type to '{}'", config_path.display());
    Ok(true)
}

// ─── Records ──────────────────────────────────────────────────────────────────
/// Load encoder weights recorded by `save_encoder`.
pub fn load_encoder<B: Backend>(
    encoder: Encoder<B>,
    stem:    &Path,
    device:  &B::Device,
) -> Result<Encoder<B>> {
    let record = CompactRecorder::new()
        .load(stem.to_path_buf(), device)
        .map_err(|e| HuevalError::Record {
            path:   stem.display().to_string(),
            reason: format!("{e:?}"),
        })?;
    tracing::info!("Loaded encoder weights from '{}'", stem.display());
    Ok(encoder.load_record(record))
}

/// Write the encoder record plus the files that make `dir` a checkpoint.
pub fn save_encoder<B: Backend>(
    encoder:    &Encoder<B>,
    checkpoint: &ResolvedCheckpoint,
    dir:        &Path,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let stem = dir.join(WEIGHTS_STEM);
    CompactRecorder::new()
        .record(encoder.clone().into_record(), stem.clone())
        .map_err(|e| HuevalError::Record {
            path:   stem.display().to_string(),
            reason: format!("{e:?}"),
        })?;

    fs::copy(&checkpoint.config, dir.join(CONFIG_FILE))?;
    let tokenizer_name = match checkpoint.tokenizer {
        TokenizerSource::Json(_)  => TOKENIZER_FILE,
        TokenizerSource::Vocab(_) => VOCAB_FILE,
    };
    fs::copy(checkpoint.tokenizer.path(), dir.join(tokenizer_name))?;
    if let TokenizerSource::Vocab(vocab) = &checkpoint.tokenizer {
        let casing = vocab.with_file_name(TOKENIZER_CONFIG_FILE);
        if casing.is_file() {
            fs::copy(&casing, dir.join(TOKENIZER_CONFIG_FILE))?;
        }
    }

    tracing::info!("Saved encoder checkpoint to '{}'", dir.display());
    Ok(())
}

/// Save a run configuration as pretty JSON.
pub fn save_run_config<T: Serialize>(dir: &Path, config: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(RUN_CONFIG_FILE);
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    tracing::debug!("Saved run config to '{}'", path.display());
    Ok(path)
}

pub fn load_run_config<T: DeserializeOwned>(dir: &Path) -> Result<T> {
    let text = fs::read_to_string(dir.join(RUN_CONFIG_FILE))?;
    Ok(serde_json::from_str(&text)?)
}
