//! unirag-semantic
//!
//! Semantic retrieval: an embedding provider plus a vector-search backend
//! composed behind the `Retriever` trait. Ships a LanceDB backend adapter
//! and a deterministic hashing embedder for tests and offline runs.

pub mod embed;
pub mod lance;
pub mod retriever;

pub use embed::HashEmbedder;
pub use lance::LanceDbBackend;
pub use retriever::SemanticRetriever;
