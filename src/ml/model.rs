// ============================================================
// Layer 5 — Transformer Encoder
// ============================================================
// A BERT-style encoder whose shape is read from a checkpoint's
// config.json:
//
//   input_ids ─► word + position + token-type embeddings
//             ─► LayerNorm ─► dropout
//             ─► N × [ self-attention ─► add & norm
//                      feed-forward   ─► add & norm ]
//             ─► hidden states [batch, seq_len, hidden]
//
// Padding positions are masked out of attention. The pooler
// (dense + tanh over [CLS]) feeds the sentence-level heads.
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::HuevalError;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_layers:              usize,
    pub num_heads:               usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 0.1)]
    pub dropout:                 f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

/// The subset of a Hugging Face config.json the encoder needs.
/// Accepts both BERT and DistilBERT field names.
#[derive(Debug, Clone, Deserialize)]
struct CheckpointConfig {
    vocab_size: usize,
    #[serde(alias = "dim")]
    hidden_size: usize,
    #[serde(alias = "n_layers")]
    num_hidden_layers: usize,
    #[serde(alias = "n_heads")]
    num_attention_heads: usize,
    #[serde(alias = "hidden_dim")]
    intermediate_size: usize,
    max_position_embeddings: usize,
    #[serde(default)]
    type_vocab_size: Option<usize>,
    #[serde(default, alias = "dropout")]
    hidden_dropout_prob: Option<f64>,
    #[serde(default)]
    layer_norm_eps: Option<f64>,
}

impl EncoderConfig {
    /// Read the architecture from a checkpoint's config.json.
    pub fn from_checkpoint(path: &Path) -> crate::error::Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| HuevalError::model_load(path.display().to_string(), e.to_string()))?;
        Self::from_json(&text)
            .map_err(|e| HuevalError::model_load(path.display().to_string(), e.to_string()))
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: CheckpointConfig = serde_json::from_str(text)?;
        // DistilBERT has no segment embeddings; keep a single type row
        let type_vocab_size = raw.type_vocab_size.unwrap_or(1).max(1);

        Ok(Self::new(
            raw.vocab_size,
            raw.hidden_size,
            raw.num_hidden_layers,
            raw.num_attention_heads,
            raw.intermediate_size,
            raw.max_position_embeddings,
        )
        .with_type_vocab_size(type_vocab_size)
        .with_dropout(raw.hidden_dropout_prob.unwrap_or(0.1))
        .with_layer_norm_eps(raw.layer_norm_eps.unwrap_or(1e-12)))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let word_embedding     = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device);
        let type_embedding     = EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device);
        let embedding_norm     = self.layer_norm().init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler  = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        Encoder {
            word_embedding, position_embedding, type_embedding, embedding_norm,
            layers, pooler, dropout,
            hidden_size:     self.hidden_size,
            max_positions:   self.max_position_embeddings,
            type_vocab_size: self.type_vocab_size,
        }
    }

    fn layer_norm(&self) -> LayerNormConfig {
        LayerNormConfig::new(self.hidden_size).with_epsilon(self.layer_norm_eps)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm1   = self.layer_norm().init(device);
        let norm2   = self.layer_norm().init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `mask_pad`: [batch, seq_len], true at padding positions
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(mask_pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub word_embedding:     Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub type_embedding:     Embedding<B>,
    pub embedding_norm:     LayerNorm<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub pooler:             Linear<B>,
    pub dropout:            Dropout,
    pub hidden_size:        usize,
    pub max_positions:      usize,
    pub type_vocab_size:    usize,
}

impl<B: Backend> Encoder<B> {
    /// input_ids, attention_mask, type_ids: [batch, seq_len]
    /// → hidden states [batch, seq_len, hidden]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        type_ids:       Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // models without segment embeddings see every token as segment 0
        let type_ids = type_ids.clamp(0, self.type_vocab_size as i64 - 1);

        let embedded = self.word_embedding.forward(input_ids)
            + self.position_embedding.forward(positions)
            + self.type_embedding.forward(type_ids);
        let mut x = self.dropout.forward(self.embedding_norm.forward(embedded));

        let mask_pad = attention_mask.equal_elem(0);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }
        x
    }

    /// Sentence representation: tanh(W · h[CLS]) — [batch, hidden]
    pub fn pool(&self, hidden: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, hidden_size] = hidden.dims();
        let cls = hidden
            .slice([0..batch_size, 0..1, 0..hidden_size])
            .reshape([batch_size, hidden_size]);
        burn::tensor::activation::tanh(self.pooler.forward(cls))
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    pub(crate) type B = NdArray;

    /// Held by every test that draws initial weights: the NdArray
    /// backend keeps one process-wide RNG.
    pub(crate) fn rng_guard() -> std::sync::MutexGuard<'static, ()> {
        static RNG: std::sync::Mutex<()> = std::sync::Mutex::new(());
        RNG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Two layers, 16 hidden units: small enough for CPU tests.
    pub(crate) fn tiny_config() -> EncoderConfig {
        EncoderConfig::new(64, 16, 2, 2, 32, 16).with_dropout(0.0)
    }

    #[test]
    fn test_bert_config_fields() {
        let json = r#"{
            "model_type": "bert", "vocab_size": 32001, "hidden_size": 768,
            "num_hidden_layers": 12, "num_attention_heads": 12,
            "intermediate_size": 3072, "max_position_embeddings": 512,
            "type_vocab_size": 2, "hidden_dropout_prob": 0.1, "layer_norm_eps": 1e-12
        }"#;
        let cfg = EncoderConfig::from_json(json).unwrap();
        assert_eq!(cfg.hidden_size, 768);
        assert_eq!(cfg.num_layers, 12);
        assert_eq!(cfg.type_vocab_size, 2);
    }

    #[test]
    fn test_distilbert_config_fields() {
        let json = r#"{
            "model_type": "distilbert", "vocab_size": 119547, "dim": 768,
            "n_layers": 6, "n_heads": 12, "hidden_dim": 3072,
            "max_position_embeddings": 512, "dropout": 0.1
        }"#;
        let cfg = EncoderConfig::from_json(json).unwrap();
        assert_eq!(cfg.num_layers, 6);
        assert_eq!(cfg.intermediate_size, 3072);
        assert_eq!(cfg.type_vocab_size, 1);
    }

    #[test]
    fn test_forward_shapes() {
        let device  = Default::default();
        let _rng    = rng_guard();
        let encoder = tiny_config().init::<B>(&device);

        let ids   = Tensor::<B, 2, Int>::from_ints([[1, 5, 6, 2, 0, 0], [1, 7, 2, 0, 0, 0]], &device);
        let mask  = Tensor::<B, 2, Int>::from_ints([[1, 1, 1, 1, 0, 0], [1, 1, 1, 0, 0, 0]], &device);
        let types = Tensor::<B, 2, Int>::zeros([2, 6], &device);

        let hidden = encoder.forward(ids, mask, types);
        assert_eq!(hidden.dims(), [2, 6, 16]);
        assert_eq!(encoder.pool(hidden).dims(), [2, 16]);
        assert_eq!(encoder.hidden_size(), 16);
    }
}
