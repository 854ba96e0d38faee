use std::collections::HashMap;
use std::path::Path;

use anyhow::anyhow;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::info;

use unirag_core::error::{Result, RetrievalError};
use unirag_core::traits::RelevanceScorer;

const MAX_LEN: usize = 256;

/// Cross-encoder relevance model: a BERT encoder with the sequence
/// classification head (pooler + single-logit classifier) applied to the
/// concatenated (query, passage) pair. One forward pass per candidate,
/// which is why the candidate limiter runs first.
pub struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderModel {
    /// Load tokenizer, config and weights from a local model directory
    /// (the export of a `cross-encoder/ms-marco-*` checkpoint). Any missing
    /// artifact fails here, so pipeline construction fails fast instead of
    /// erroring on the first query.
    pub fn load(model_dir: &Path, device: Device) -> Result<Self> {
        Self::load_inner(model_dir, device).map_err(|e| {
            RetrievalError::Configuration(format!(
                "failed to load cross-encoder from {}: {e:#}",
                model_dir.display()
            ))
        })
    }

    fn load_inner(model_dir: &Path, device: Device) -> anyhow::Result<Self> {
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
        let config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let vb = load_weights(model_dir, &device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = candle_nn::linear(
            config.hidden_size,
            config.hidden_size,
            vb.pp("bert.pooler.dense"),
        )?;
        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;
        info!(model_dir = %model_dir.display(), "cross-encoder model loaded");
        Ok(Self { bert, pooler, classifier, tokenizer, device })
    }

    fn score_pair(&self, query: &str, passage: &str) -> anyhow::Result<f32> {
        let enc = self
            .tokenizer
            .encode((query, passage), true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut type_ids = enc.get_type_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > MAX_LEN {
            ids.truncate(MAX_LEN);
            type_ids.truncate(MAX_LEN);
            mask.truncate(MAX_LEN);
        }
        if ids.len() < MAX_LEN {
            let pad = MAX_LEN - ids.len();
            ids.extend(std::iter::repeat(0u32).take(pad));
            type_ids.extend(std::iter::repeat(0u32).take(pad));
            mask.extend(std::iter::repeat(0u32).take(pad));
        }
        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, MAX_LEN))?;
        let token_type_ids = Tensor::from_iter(type_ids, &self.device)?.reshape((1, MAX_LEN))?;
        let attention_mask = Tensor::from_iter(mask, &self.device)?.reshape((1, MAX_LEN))?;

        let hidden = self.bert.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        // Classification head over the [CLS] position.
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logit = self.classifier.forward(&pooled)?;
        let raw = logit.squeeze(1)?.squeeze(0)?.to_scalar::<f32>()?;
        Ok(sigmoid(raw))
    }
}

impl RelevanceScorer for CrossEncoderModel {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(passages.len());
        for passage in passages {
            let score = self
                .score_pair(query, passage)
                .map_err(|e| RetrievalError::backend("cross-encoder inference failed", e))?;
            scores.push(score);
        }
        Ok(scores)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // Safety: the mapped weight file must stay unmodified for the model
        // lifetime, which holds for a read-only model export.
        return Ok(unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)?
        });
    }
    let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
    let tensors: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

/// Sigmoid normalization: maps raw logits into the 0-1 range without
/// changing their order.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_midpoint_and_extremes() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn sigmoid_preserves_order() {
        assert!(sigmoid(2.0) > sigmoid(1.0));
        assert!(sigmoid(-1.0) > sigmoid(-2.0));
    }

    #[test]
    fn missing_model_directory_fails_at_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = CrossEncoderModel::load(&tmp.path().join("no-such-model"), Device::Cpu)
            .err()
            .expect("must fail");
        assert!(matches!(err, RetrievalError::Configuration(_)), "got: {err}");
    }
}
