//! Ingest-and-query pipeline.
//!
//! [`RagPipeline`] composes a [`Chunker`], an optional [`SegmentTransformer`],
//! an [`EmbeddingProvider`] and a [`VectorStore`]. Ingestion runs
//! chunk → transform → embed → upsert; queries run embed → search → filter.
//!
//! # Example
//!
//! ```rust,ignore
//! use codepal_rag::{RagPipeline, RagConfig, InMemoryVectorStore, ParagraphChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection("kb").await?;
//! pipeline.ingest_batch("kb", &documents).await?;
//! let results = pipeline.query("kb", "how do I learn Rust?").await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, ParagraphChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::transformer::{FileNamePrefixTransformer, SegmentTransformer};
use crate::vectorstore::VectorStore;

/// Knowledge-base ingestion and similarity search over one vector store.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    transformer: Option<Arc<dyn SegmentTransformer>>,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The provider shared by ingestion and retrieval.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection sized for the configured embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            RagError::PipelineError(format!("failed to create collection '{name}': {e}"))
        })
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
            RagError::PipelineError(format!("failed to delete collection '{name}': {e}"))
        })
    }

    /// Ingest a single document and return the stored chunks.
    ///
    /// Chunk IDs are derived from the document ID and the document's previous
    /// records are replaced as a whole, so ingesting it again never leaves
    /// duplicates or stale segments behind.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            let removed = self.vector_store.remove_document(collection, &document.id).await.map_err(|e| {
                RagError::PipelineError(format!("cleanup failed for document '{}': {e}", document.id))
            })?;
            info!(document.id = %document.id, chunk_count = 0, removed, "ingested document (empty)");
            return Ok(chunks);
        }

        if let Some(transformer) = &self.transformer {
            for chunk in &mut chunks {
                transformer.transform(chunk);
            }
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            RagError::PipelineError(format!("embedding failed for document '{}': {e}", document.id))
        })?;

        if embeddings.len() != chunks.len() {
            error!(
                document.id = %document.id,
                expected = chunks.len(),
                got = embeddings.len(),
                "embedding count mismatch"
            );
            return Err(RagError::PipelineError(format!(
                "embedding provider returned {} vectors for {} chunks of document '{}'",
                embeddings.len(),
                chunks.len(),
                document.id
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.replace_document(collection, &document.id, &chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            RagError::PipelineError(format!("upsert failed for document '{}': {e}", document.id))
        })?;

        let chunk_count = chunks.len();
        info!(document.id = %document.id, chunk_count, "ingested document");

        Ok(chunks)
    }

    /// Ingest several documents, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] naming the document that failed.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let chunks = self.ingest(collection, document).await?;
            all_chunks.extend(chunks);
        }
        info!(collection, document_count = documents.len(), chunk_count = all_chunks.len(), "ingested batch");
        Ok(all_chunks)
    }

    /// Query with the configured `max_results` and `min_score`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.query_with(collection, query, self.config.max_results, self.config.min_score).await
    }

    /// Query with explicit limits.
    ///
    /// Returns at most `max_results` results, each scoring at least
    /// `min_score`, ordered by descending score. No match is an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn query_with(
        &self,
        collection: &str,
        query: &str,
        max_results: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let results =
            self.vector_store.search(collection, &query_embedding, max_results).await.map_err(
                |e| {
                    error!(collection, error = %e, "vector store search failed");
                    RagError::PipelineError(format!(
                        "search failed in collection '{collection}': {e}"
                    ))
                },
            )?;

        let filtered: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.score >= min_score)
            .take(max_results)
            .collect();

        info!(collection, result_count = filtered.len(), "query completed");

        Ok(filtered)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_store` are required. The chunker
/// defaults to a [`ParagraphChunker`] sized from the config, and the
/// transformer to [`FileNamePrefixTransformer`]; call
/// [`without_transformer`](RagPipelineBuilder::without_transformer) to embed
/// raw segments.
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    transformer: Option<Arc<dyn SegmentTransformer>>,
}

impl Default for RagPipelineBuilder {
    fn default() -> Self {
        Self {
            config: None,
            embedding_provider: None,
            vector_store: None,
            chunker: None,
            transformer: Some(Arc::new(FileNamePrefixTransformer)),
        }
    }
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the segment transformer.
    pub fn transformer(mut self, transformer: Arc<dyn SegmentTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Embed segments exactly as the chunker produced them.
    pub fn without_transformer(mut self) -> Self {
        self.transformer = None;
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(ParagraphChunker::new(config.max_segment_size, config.max_overlap_size))
        });

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            transformer: self.transformer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;

    #[test]
    fn build_requires_provider_and_store() {
        let missing_store = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .build();
        assert!(matches!(missing_store, Err(RagError::ConfigError(_))));

        let missing_provider =
            RagPipeline::builder().vector_store(Arc::new(InMemoryVectorStore::new())).build();
        assert!(matches!(missing_provider, Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn ingest_applies_file_name_prefix() {
        let pipeline = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();
        pipeline.create_collection("kb").await.unwrap();

        let doc = Document::from_file_name("guide.md", "Learn ownership first.");
        let chunks = pipeline.ingest("kb", &doc).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "guide.md\nLearn ownership first.");
        assert_eq!(chunks[0].embedding.len(), 256);
    }

    #[tokio::test]
    async fn ingest_into_missing_collection_fails() {
        let pipeline = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();
        let doc = Document::from_file_name("a.md", "text");
        assert!(matches!(pipeline.ingest("missing", &doc).await, Err(RagError::PipelineError(_))));
    }
}
