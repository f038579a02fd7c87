use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    /// A segmenter could not split a document.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// Inconsistent settings, reported when a builder is finished.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion or query failed; the message names the document or collection.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// A knowledge-base file or directory could not be read.
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RagError {
    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
