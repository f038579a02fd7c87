//! # codepal-rag
//!
//! Knowledge-base retrieval for codepal.
//!
//! Documents are loaded from a directory ([`FileSystemDocumentLoader`]),
//! split into overlapping paragraph-aware segments ([`ParagraphChunker`]),
//! prefixed with their file name ([`FileNamePrefixTransformer`]), embedded
//! ([`EmbeddingProvider`]) and stored ([`VectorStore`]). At query time a
//! [`ContentRetriever`] returns the best-scoring segments above a threshold.
//!
//! ## Features
//!
//! - `openai` (default): [`openai::OpenAiEmbeddingProvider`] for
//!   OpenAI-compatible `/embeddings` endpoints.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod transformer;
pub mod vectorstore;

pub use chunking::{Chunker, ParagraphChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, FILE_NAME_KEY, SOURCE_KEY, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use loader::FileSystemDocumentLoader;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbeddingProvider;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::{ContentRetriever, ContentRetrieverBuilder};
pub use transformer::{FileNamePrefixTransformer, SegmentTransformer};
pub use vectorstore::VectorStore;
