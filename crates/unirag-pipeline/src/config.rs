//! Pipeline configuration.
//!
//! Uses Figment to merge built-in defaults + `unirag.toml` + `UNIRAG_*` env
//! vars into one immutable struct. Constructed once per pipeline; never
//! mutated afterward.

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use unirag_core::error::{Result, RetrievalError};
use unirag_core::paths::expand_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched from the semantic retriever.
    pub k_semantic: usize,
    /// Candidates fetched from the lexical (BM25) retriever.
    pub k_bm25: usize,
    /// Relative trust in the semantic signal; together with
    /// `weight_lexical` must sum to 1.0.
    pub weight_semantic: f32,
    pub weight_lexical: f32,
    /// Cap on fused candidates forwarded to the cross-encoder.
    pub fusion_top_k: usize,
    /// Final result-set size after reranking.
    pub rerank_top_n: usize,
    /// Identifier of the joint relevance model, surfaced in logs. Weights
    /// are loaded from `reranker_model_dir`.
    pub reranker_model_id: String,
    /// Local directory holding tokenizer.json, config.json and weights.
    pub reranker_model_dir: String,
    /// Compute device for the reranker: "cpu", "metal" or "cuda".
    pub rerank_device: String,
    /// Lexical index persistence location.
    pub index_path: String,
    /// Rebuild the lexical index even when a persisted one exists.
    pub force_rebuild_index: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_semantic: 40,
            k_bm25: 40,
            weight_semantic: 0.4,
            weight_lexical: 0.6,
            fusion_top_k: 60,
            rerank_top_n: 7,
            reranker_model_id: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            reranker_model_dir: "models/ms-marco-minilm-l6-v2".to_string(),
            rerank_device: "cpu".to_string(),
            index_path: "unirag_index".to_string(),
            force_rebuild_index: false,
        }
    }
}

impl RetrievalConfig {
    /// Merge defaults <- `unirag.toml` <- `UNIRAG_*` environment variables.
    pub fn load() -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("unirag.toml"))
            .merge(Env::prefixed("UNIRAG_"))
            .extract()
            .map_err(|e| {
                RetrievalError::Configuration(format!("failed to load configuration: {e}"))
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_semantic == 0 || self.k_bm25 == 0 {
            return Err(RetrievalError::Configuration(
                "retriever candidate counts must be positive".to_string(),
            ));
        }
        let weight_sum = self.weight_semantic + self.weight_lexical;
        if (weight_sum - 1.0).abs() > 1e-3 {
            return Err(RetrievalError::Configuration(format!(
                "fusion weights must sum to 1.0, got {weight_sum}"
            )));
        }
        if self.reranker_model_id.trim().is_empty() {
            return Err(RetrievalError::Configuration(
                "reranker_model_id must not be empty".to_string(),
            ));
        }
        if self.rerank_top_n == 0 {
            return Err(RetrievalError::Configuration(
                "rerank_top_n must be positive".to_string(),
            ));
        }
        if self.fusion_top_k < self.rerank_top_n {
            return Err(RetrievalError::Configuration(format!(
                "fusion_top_k ({}) must be at least rerank_top_n ({})",
                self.fusion_top_k, self.rerank_top_n
            )));
        }
        Ok(())
    }

    /// `index_path` with `~` and `$VAR` expanded.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_path(&self.index_path)
    }

    /// `reranker_model_dir` with `~` and `$VAR` expanded.
    pub fn resolved_model_dir(&self) -> PathBuf {
        expand_path(&self.reranker_model_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        RetrievalConfig::default().validate().expect("defaults are coherent");
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let config = RetrievalConfig {
            weight_semantic: 0.8,
            weight_lexical: 0.6,
            ..RetrievalConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, RetrievalError::Configuration(_)));
    }

    #[test]
    fn cap_below_final_size_rejected() {
        let config = RetrievalConfig {
            fusion_top_k: 5,
            rerank_top_n: 7,
            ..RetrievalConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, RetrievalError::Configuration(_)));
    }

    #[test]
    fn zero_candidate_counts_rejected() {
        let config = RetrievalConfig { k_bm25: 0, ..RetrievalConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_model_id_rejected() {
        let config = RetrievalConfig {
            reranker_model_id: "  ".to_string(),
            ..RetrievalConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, RetrievalError::Configuration(_)));
    }

    #[test]
    fn env_overrides_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "unirag.toml",
                r#"
                    rerank_top_n = 5
                    fusion_top_k = 30
                "#,
            )?;
            jail.set_env("UNIRAG_RERANK_TOP_N", "9");

            let config = RetrievalConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.rerank_top_n, 9, "env beats file");
            assert_eq!(config.fusion_top_k, 30, "file beats defaults");
            assert_eq!(config.k_semantic, 40, "untouched keys keep defaults");
            Ok(())
        });
    }
}
