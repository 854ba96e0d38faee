use tracing::debug;

use unirag_core::error::Result;
use unirag_core::traits::{Embedder, Retriever, VectorSearchBackend};
use unirag_core::types::Document;

/// Adapter that turns an embedding provider plus a vector-search backend
/// into a `Retriever`.
///
/// Backend failures propagate untouched; retry/backoff policy belongs to
/// the backend's own client, not this layer.
pub struct SemanticRetriever {
    embedder: Box<dyn Embedder>,
    backend: Box<dyn VectorSearchBackend>,
    filter: Option<String>,
}

impl SemanticRetriever {
    pub fn new(embedder: Box<dyn Embedder>, backend: Box<dyn VectorSearchBackend>) -> Self {
        Self { embedder, backend, filter: None }
    }

    /// Restrict similarity search with a backend-native predicate. Passed
    /// through untouched; the backend owns its filter syntax.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

impl Retriever for SemanticRetriever {
    fn search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let query_vec = self.embedder.embed(query)?;
        debug!(k, dim = query_vec.len(), "semantic search");
        self.backend.similarity_search(&query_vec, k, self.filter.as_deref())
    }
}
