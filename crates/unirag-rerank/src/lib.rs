//! unirag-rerank
//!
//! Second-pass precision stage: a cross-encoder scores each (query,
//! candidate) pair jointly and the best few survive. Model inference runs
//! on candle; the compute device is a configuration choice.

pub mod device;
pub mod model;

pub use device::select_device;
pub use model::CrossEncoderModel;

use tracing::debug;

use unirag_core::error::Result;
use unirag_core::traits::RelevanceScorer;
use unirag_core::types::Document;

/// The rerank stage: scores every candidate jointly against the query and
/// keeps the `top_n` best.
pub struct Reranker {
    scorer: Box<dyn RelevanceScorer>,
}

impl Reranker {
    pub fn new(scorer: Box<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    /// Output length is `min(top_n, candidates.len())`; a short candidate
    /// list is never padded. Ties keep candidate order, so a fixed scorer
    /// yields a fixed ranking.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<Document>,
        top_n: usize,
    ) -> Result<Vec<Document>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let passages: Vec<String> = candidates.iter().map(|d| d.content.clone()).collect();
        let scores = self.scorer.score(query, &passages)?;
        debug!(candidates = candidates.len(), top_n, "reranking");

        let mut scored: Vec<(f32, Document)> = scores.into_iter().zip(candidates).collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);
        Ok(scored.into_iter().map(|(_, document)| document).collect())
    }
}

/// Deterministic scorer for tests and offline runs: the fraction of query
/// tokens present in the passage, case-insensitive.
pub struct OverlapScorer;

impl RelevanceScorer for OverlapScorer {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        Ok(passages
            .iter()
            .map(|passage| {
                if terms.is_empty() {
                    return 0.0;
                }
                let passage_lower = passage.to_lowercase();
                let hits = terms.iter().filter(|t| passage_lower.contains(**t)).count();
                hits as f32 / terms.len() as f32
            })
            .collect())
    }
}
