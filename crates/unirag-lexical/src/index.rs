use std::path::{Path, PathBuf};

use tantivy::{doc, Index};
use tempfile::TempDir;
use tracing::{info, warn};

use unirag_core::error::{Result, RetrievalError};
use unirag_core::types::Document;

use crate::search::LexicalRetriever;
use crate::tantivy_utils::{build_schema, register_tokenizer, CONTENT_FIELD, METADATA_FIELD};

/// Loads a persisted lexical index when a usable one exists, builds (and
/// persists) one otherwise.
///
/// The persisted index is reused as long as it exists and `force_rebuild`
/// is false. Corpus changes never invalidate it; rebuilds are manual. The
/// index directory is written at most once per process lifetime and is
/// read-only afterward; coordinating writers across processes is on the
/// caller.
pub struct LexicalIndexManager {
    index_path: PathBuf,
}

impl LexicalIndexManager {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self { index_path: index_path.into() }
    }

    /// Return a ready-to-query BM25 retriever.
    ///
    /// `documents` is the corpus snapshot and is required only when a build
    /// is necessary; it may be empty when a persisted index is being
    /// reused. An unreadable or empty persisted index falls through to a
    /// rebuild; a build with an empty snapshot is a configuration error,
    /// not an empty-result success.
    pub fn load_or_build(
        &self,
        documents: &[Document],
        force_rebuild: bool,
    ) -> Result<LexicalRetriever> {
        if self.persisted_index_present() && !force_rebuild {
            match self.open_persisted() {
                Ok(retriever) => return Ok(retriever),
                Err(e) => {
                    warn!(
                        path = %self.index_path.display(),
                        error = %e,
                        "persisted lexical index unusable, rebuilding"
                    );
                }
            }
        }

        if documents.is_empty() {
            return Err(RetrievalError::Configuration(
                "cannot build lexical index: document snapshot is empty".to_string(),
            ));
        }

        info!(documents = documents.len(), "building lexical index");
        match self.stage_on_disk() {
            Ok((staging, index)) => {
                populate(&index, documents)?;
                drop(index);
                match self.publish(staging) {
                    Ok(()) => self.open_persisted(),
                    Err(e) => {
                        warn!(
                            path = %self.index_path.display(),
                            error = %e,
                            "could not persist lexical index, continuing with an in-memory index"
                        );
                        build_in_ram(documents)
                    }
                }
            }
            Err(e) => {
                warn!(
                    path = %self.index_path.display(),
                    error = %e,
                    "could not persist lexical index, continuing with an in-memory index"
                );
                build_in_ram(documents)
            }
        }
    }

    /// Explicit existence check so "no index yet" stays an expected branch
    /// rather than a caught open error.
    fn persisted_index_present(&self) -> bool {
        self.index_path.join("meta.json").exists()
    }

    fn open_persisted(&self) -> Result<LexicalRetriever> {
        let index = Index::open_in_dir(&self.index_path)
            .map_err(|e| RetrievalError::backend("failed to open persisted lexical index", e))?;
        register_tokenizer(&index);
        // Schema validation happens here: an index without our two fields is
        // not recognized as a lexical retriever and triggers a rebuild.
        let retriever = LexicalRetriever::from_index(index)?;
        // An index with nothing committed is a crash remnant, not a corpus.
        if retriever.num_docs() == 0 {
            return Err(RetrievalError::Configuration(
                "persisted lexical index holds no documents".to_string(),
            ));
        }
        info!(path = %self.index_path.display(), "loaded persisted lexical index");
        Ok(retriever)
    }

    /// The index is built in a sibling staging directory and only renamed
    /// into place once fully committed, so a crash mid-build never leaves a
    /// partial index at `index_path`.
    fn stage_on_disk(&self) -> anyhow::Result<(TempDir, Index)> {
        let parent = self
            .index_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".unirag-index-staging-")
            .tempdir_in(parent)?;
        let index = Index::create_in_dir(staging.path(), build_schema())?;
        register_tokenizer(&index);
        Ok((staging, index))
    }

    /// Swap the committed staging directory into `index_path`. The previous
    /// artifact is removed only after the replacement is fully committed, so
    /// a failed rebuild cannot destroy a good index.
    fn publish(&self, staging: TempDir) -> anyhow::Result<()> {
        if self.index_path.exists() {
            std::fs::remove_dir_all(&self.index_path)?;
        }
        std::fs::rename(staging.path(), &self.index_path)?;
        // After the rename the staging path is gone; the TempDir guard's
        // cleanup on drop is a no-op.
        Ok(())
    }
}

fn build_in_ram(documents: &[Document]) -> Result<LexicalRetriever> {
    let index = Index::create_in_ram(build_schema());
    register_tokenizer(&index);
    populate(&index, documents)?;
    LexicalRetriever::from_index(index)
}

fn populate(index: &Index, documents: &[Document]) -> Result<()> {
    let schema = index.schema();
    let content_field = schema
        .get_field(CONTENT_FIELD)
        .map_err(|e| RetrievalError::backend("lexical schema missing content field", e))?;
    let metadata_field = schema
        .get_field(METADATA_FIELD)
        .map_err(|e| RetrievalError::backend("lexical schema missing metadata field", e))?;

    let mut index_writer = index
        .writer(50_000_000)
        .map_err(|e| RetrievalError::backend("failed to create lexical index writer", e))?;
    for document in documents {
        let metadata_json = serde_json::to_string(&document.metadata)
            .map_err(|e| RetrievalError::backend("failed to serialize document metadata", e))?;
        index_writer
            .add_document(doc!(
                content_field => document.content.clone(),
                metadata_field => metadata_json,
            ))
            .map_err(|e| RetrievalError::backend("failed to index document", e))?;
    }
    index_writer
        .commit()
        .map_err(|e| RetrievalError::backend("failed to commit lexical index", e))?;
    Ok(())
}
