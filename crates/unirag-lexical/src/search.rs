use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, TantivyDocument};

use unirag_core::error::{Result, RetrievalError};
use unirag_core::traits::Retriever;
use unirag_core::types::{Document, Meta};

use crate::tantivy_utils::{CONTENT_FIELD, METADATA_FIELD};

/// BM25 retriever over a loaded tantivy index. Deterministic for a fixed
/// index and query.
pub struct LexicalRetriever {
    index: Index,
    reader: IndexReader,
    content_field: tantivy::schema::Field,
    metadata_field: tantivy::schema::Field,
}

impl LexicalRetriever {
    pub(crate) fn from_index(index: Index) -> Result<Self> {
        let reader = index
            .reader()
            .map_err(|e| RetrievalError::backend("failed to open lexical index reader", e))?;
        let schema = index.schema();
        let content_field = schema
            .get_field(CONTENT_FIELD)
            .map_err(|e| RetrievalError::backend("lexical index has unexpected schema", e))?;
        let metadata_field = schema
            .get_field(METADATA_FIELD)
            .map_err(|e| RetrievalError::backend("lexical index has unexpected schema", e))?;
        Ok(Self { index, reader, content_field, metadata_field })
    }

    /// Number of committed documents visible to searches.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl Retriever for LexicalRetriever {
    fn search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        // Lenient parse: free-text user queries may contain characters the
        // query grammar reserves.
        let (parsed, _errors) = query_parser.parse_query_lenient(query);
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(k))
            .map_err(|e| RetrievalError::backend("lexical search failed", e))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let stored: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| RetrievalError::backend("failed to load indexed document", e))?;
            let content = stored
                .get_first(self.content_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let metadata: Meta = stored
                .get_first(self.metadata_field)
                .and_then(|v| v.as_str())
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| RetrievalError::backend("stored metadata is not valid JSON", e))?
                .unwrap_or_default();
            results.push(Document { content, metadata });
        }
        Ok(results)
    }
}
