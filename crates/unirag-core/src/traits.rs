use crate::error::Result;
use crate::types::Document;

/// A ranked-retrieval capability: up to `k` documents ordered by descending
/// relevance. Both the lexical and the semantic retrievers implement this,
/// so the fusion stage can treat them uniformly.
pub trait Retriever: Send + Sync {
    fn search(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}

/// Query/passage embedding provider. An external collaborator; must be
/// deterministic for identical input so rankings are reproducible.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Vector similarity search over an externally maintained store, ordered by
/// descending similarity. `filter` is an opaque backend-native predicate
/// passed through untouched.
pub trait VectorSearchBackend: Send + Sync {
    fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<Document>>;
}

/// Joint (query, passage) relevance model backing the rerank stage. Returns
/// one score per passage; higher is more relevant.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;
}
