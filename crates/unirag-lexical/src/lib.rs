//! unirag-lexical
//!
//! Tantivy-backed lexical (BM25) retrieval: schema and tokenizer setup, the
//! load-or-build index manager, and the retriever it produces.

pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::LexicalIndexManager;
pub use search::LexicalRetriever;
