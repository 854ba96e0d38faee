use std::path::Path;

use arrow_array::{RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use tokio::runtime::Runtime;
use tracing::debug;

use unirag_core::error::{Result, RetrievalError};
use unirag_core::traits::VectorSearchBackend;
use unirag_core::types::{Document, Meta};

/// Read-only adapter over a LanceDB table maintained by the surrounding
/// system. The table must carry `content` (utf8), `metadata` (utf8, one
/// JSON object per row) and `vector` (fixed-size float list) columns.
///
/// The pipeline is synchronous, so the adapter owns a dedicated tokio
/// runtime and blocks on it for each call.
pub struct LanceDbBackend {
    db: Connection,
    table_name: String,
    runtime: Runtime,
}

impl LanceDbBackend {
    pub fn connect(db_path: &Path, table_name: &str) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| RetrievalError::backend("failed to start lancedb runtime", e))?;
        let db = runtime
            .block_on(async { connect(db_path.to_string_lossy().as_ref()).execute().await })
            .map_err(|e| RetrievalError::backend("failed to connect to lancedb", e))?;
        Ok(Self { db, table_name: table_name.to_string(), runtime })
    }

    /// Batch-export documents so the corpus snapshot for the lexical index
    /// build can come straight from the vector store.
    pub fn export_documents(&self, limit: usize) -> Result<Vec<Document>> {
        self.runtime.block_on(async {
            let table = self
                .db
                .open_table(&self.table_name)
                .execute()
                .await
                .map_err(|e| RetrievalError::backend("failed to open lancedb table", e))?;
            let mut stream = table
                .query()
                .limit(limit)
                .execute()
                .await
                .map_err(|e| RetrievalError::backend("lancedb scan failed", e))?;
            let mut documents = Vec::new();
            while let Some(batch) = stream
                .try_next()
                .await
                .map_err(|e| RetrievalError::backend("lancedb scan failed", e))?
            {
                collect_documents(&batch, &mut documents)?;
            }
            debug!(exported = documents.len(), "corpus snapshot exported from lancedb");
            Ok(documents)
        })
    }
}

impl VectorSearchBackend for LanceDbBackend {
    fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<Document>> {
        self.runtime.block_on(async {
            let table = self
                .db
                .open_table(&self.table_name)
                .execute()
                .await
                .map_err(|e| RetrievalError::backend("failed to open lancedb table", e))?;
            let mut query = table
                .vector_search(query_vec.to_vec())
                .map_err(|e| RetrievalError::backend("lancedb vector search failed", e))?
                .limit(k);
            if let Some(predicate) = filter {
                query = query.only_if(predicate.to_string());
            }
            let mut stream = query
                .execute()
                .await
                .map_err(|e| RetrievalError::backend("lancedb vector search failed", e))?;
            let mut documents = Vec::new();
            while let Some(batch) = stream
                .try_next()
                .await
                .map_err(|e| RetrievalError::backend("lancedb vector search failed", e))?
            {
                collect_documents(&batch, &mut documents)?;
            }
            debug!(k, returned = documents.len(), "lancedb similarity search");
            Ok(documents)
        })
    }
}

fn collect_documents(batch: &RecordBatch, out: &mut Vec<Document>) -> Result<()> {
    let contents = column_as_string(batch, "content")?;
    let metadatas = column_as_string(batch, "metadata")?;
    for i in 0..batch.num_rows() {
        let metadata: Meta = serde_json::from_str(metadatas.value(i))
            .map_err(|e| RetrievalError::backend("stored metadata is not valid JSON", e))?;
        out.push(Document { content: contents.value(i).to_string(), metadata });
    }
    Ok(())
}

fn column_as_string<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| {
            RetrievalError::backend(
                format!("lancedb column '{name}' missing or mistyped"),
                anyhow::anyhow!("table schema mismatch"),
            )
        })
}
