use tracing::info;

use unirag_core::error::{Result, RetrievalError};
use unirag_core::traits::{Embedder, RelevanceScorer, VectorSearchBackend};
use unirag_core::types::Document;
use unirag_fusion::{limit_candidates, FusionRetriever, WeightedRetriever};
use unirag_lexical::LexicalIndexManager;
use unirag_rerank::{select_device, CrossEncoderModel, Reranker};
use unirag_semantic::SemanticRetriever;

use crate::config::RetrievalConfig;

/// The composed retrieval pipeline:
/// query → {lexical, semantic} → fusion → candidate cap → rerank.
///
/// Construction is a one-time setup phase (index load/build, model load);
/// after that `retrieve` holds no mutable state and is safe to call
/// concurrently.
pub struct RetrievalPipeline {
    fusion: FusionRetriever,
    reranker: Reranker,
    fusion_top_k: usize,
    rerank_top_n: usize,
}

impl RetrievalPipeline {
    pub fn builder(config: RetrievalConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            embedder: None,
            backend: None,
            scorer: None,
            corpus: Vec::new(),
            semantic_filter: None,
        }
    }

    /// Answer a free-text query with at most `rerank_top_n` passages,
    /// ordered by descending joint relevance.
    pub fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let fused = self.fusion.search(query)?;
        let candidates = limit_candidates(fused, self.fusion_top_k);
        self.reranker.rerank(query, candidates, self.rerank_top_n)
    }
}

/// Collaborators are injected, never reached for through globals: the
/// embedding provider and vector-search backend come from the surrounding
/// application, the cross-encoder is loaded from configuration unless a
/// scorer is supplied directly.
pub struct PipelineBuilder {
    config: RetrievalConfig,
    embedder: Option<Box<dyn Embedder>>,
    backend: Option<Box<dyn VectorSearchBackend>>,
    scorer: Option<Box<dyn RelevanceScorer>>,
    corpus: Vec<Document>,
    semantic_filter: Option<String>,
}

impl PipelineBuilder {
    pub fn embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn vector_backend(mut self, backend: Box<dyn VectorSearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Override the configured cross-encoder with an injected scorer
    /// (tests, remote scoring services).
    pub fn relevance_scorer(mut self, scorer: Box<dyn RelevanceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Corpus snapshot for the lexical index. Only consulted when the index
    /// must be (re)built; reusing a persisted index needs no snapshot.
    pub fn corpus_snapshot(mut self, documents: Vec<Document>) -> Self {
        self.corpus = documents;
        self
    }

    /// Backend-native predicate applied to every similarity search.
    pub fn semantic_filter(mut self, filter: impl Into<String>) -> Self {
        self.semantic_filter = Some(filter.into());
        self
    }

    /// Validate configuration, load the relevance model, and load or build
    /// the lexical index. Everything that can fail loudly fails here, never
    /// on the first query.
    pub fn build(self) -> Result<RetrievalPipeline> {
        self.config.validate()?;

        let embedder = self.embedder.ok_or_else(|| {
            RetrievalError::Configuration("an embedder must be provided".to_string())
        })?;
        let backend = self.backend.ok_or_else(|| {
            RetrievalError::Configuration("a vector-search backend must be provided".to_string())
        })?;

        let scorer: Box<dyn RelevanceScorer> = match self.scorer {
            Some(scorer) => scorer,
            None => {
                let device = select_device(&self.config.rerank_device)?;
                let model_dir = self.config.resolved_model_dir();
                info!(
                    model = %self.config.reranker_model_id,
                    dir = %model_dir.display(),
                    "loading cross-encoder"
                );
                Box::new(CrossEncoderModel::load(&model_dir, device)?)
            }
        };

        let lexical = LexicalIndexManager::new(self.config.resolved_index_path())
            .load_or_build(&self.corpus, self.config.force_rebuild_index)?;

        let mut semantic = SemanticRetriever::new(embedder, backend);
        if let Some(filter) = self.semantic_filter {
            semantic = semantic.with_filter(filter);
        }

        let fusion = FusionRetriever::new(vec![
            WeightedRetriever {
                retriever: Box::new(semantic),
                weight: self.config.weight_semantic,
                k: self.config.k_semantic,
            },
            WeightedRetriever {
                retriever: Box::new(lexical),
                weight: self.config.weight_lexical,
                k: self.config.k_bm25,
            },
        ])?;

        info!(
            k_semantic = self.config.k_semantic,
            k_bm25 = self.config.k_bm25,
            fusion_top_k = self.config.fusion_top_k,
            rerank_top_n = self.config.rerank_top_n,
            reranker = %self.config.reranker_model_id,
            "retrieval pipeline ready"
        );

        Ok(RetrievalPipeline {
            fusion,
            reranker: Reranker::new(scorer),
            fusion_top_k: self.config.fusion_top_k,
            rerank_top_n: self.config.rerank_top_n,
        })
    }
}
