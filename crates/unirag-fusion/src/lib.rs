//! unirag-fusion
//!
//! Weighted reciprocal-rank fusion of ranked retriever outputs, plus the
//! candidate cap applied before the expensive rerank stage.

use std::collections::HashMap;

use tracing::debug;

use unirag_core::error::{Result, RetrievalError};
use unirag_core::traits::Retriever;
use unirag_core::types::Document;

/// Rank constant in the reciprocal-rank formula `w / (rank + 1 + rrf_k)`.
/// Larger values flatten the difference between adjacent ranks.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// One fusion input: a retriever, its trust weight, and how many candidates
/// to request from it.
pub struct WeightedRetriever {
    pub retriever: Box<dyn Retriever>,
    pub weight: f32,
    pub k: usize,
}

/// Merges the ranked lists of several retrievers into one ranked list.
///
/// A document's fused score is the sum, over the lists containing it, of
/// `weight / (rank + 1 + rrf_k)`, so consensus hits accumulate
/// contributions from every list that found them. Document identity is full
/// content + metadata equality; near-duplicates are not detected.
pub struct FusionRetriever {
    inputs: Vec<WeightedRetriever>,
    rrf_k: f32,
}

impl FusionRetriever {
    /// Weights must sum to 1.0. Checked here so a weight mistake surfaces
    /// at construction instead of as a silently skewed ranking.
    pub fn new(inputs: Vec<WeightedRetriever>) -> Result<Self> {
        if inputs.is_empty() {
            return Err(RetrievalError::Configuration(
                "fusion requires at least one retriever".to_string(),
            ));
        }
        let total: f32 = inputs.iter().map(|input| input.weight).sum();
        if (total - 1.0).abs() > 1e-3 {
            return Err(RetrievalError::Configuration(format!(
                "fusion weights must sum to 1.0, got {total}"
            )));
        }
        Ok(Self { inputs, rrf_k: DEFAULT_RRF_K })
    }

    pub fn with_rrf_k(mut self, rrf_k: f32) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    /// Invoke every input retriever with its own `k` and fuse the ranked
    /// lists. Contract: if any underlying retriever fails, the whole fusion
    /// call fails; there is no fallback to the surviving lists.
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        struct Fused {
            document: Document,
            score: f32,
        }

        let mut order: HashMap<Document, usize> = HashMap::new();
        let mut fused: Vec<Fused> = Vec::new();

        for input in &self.inputs {
            let ranked = input.retriever.search(query, input.k)?;
            for (rank, document) in ranked.into_iter().enumerate() {
                let contribution = input.weight / (rank as f32 + 1.0 + self.rrf_k);
                match order.get(&document) {
                    Some(&idx) => fused[idx].score += contribution,
                    None => {
                        order.insert(document.clone(), fused.len());
                        fused.push(Fused { document, score: contribution });
                    }
                }
            }
        }

        // Stable sort on score alone: equal scores keep first-seen order,
        // so repeated calls produce identical rankings.
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!(query, fused = fused.len(), "rank fusion complete");
        Ok(fused.into_iter().map(|f| f.document).collect())
    }
}

/// Cap the candidate list ahead of reranking. Pure truncation, no
/// re-scoring; a no-op when the list is already within the cap.
pub fn limit_candidates(mut ranked: Vec<Document>, max_n: usize) -> Vec<Document> {
    ranked.truncate(max_n);
    ranked
}
