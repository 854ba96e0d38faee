use thiserror::Error;

/// Failure taxonomy for the retrieval core.
///
/// Construction-time problems are `Configuration` and surface immediately.
/// Live-call failures are `Backend` and propagate to the caller: an empty
/// result means "no relevant documents", which is a different statement
/// than "the search failed", so the two are never folded together.
/// Index-persistence trouble is neither; it is logged and absorbed.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{context}")]
    Backend {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RetrievalError {
    pub fn backend(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Backend { context: context.into(), source: source.into() }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
