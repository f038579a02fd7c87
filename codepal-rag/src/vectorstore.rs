//! Storage seam for embedded segments.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// Named collections of embedded [`Chunk`]s searchable by similarity.
///
/// Records are keyed by chunk id and grouped by `document_id`, so a
/// document can be replaced as a unit when it is ingested again.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create `name` if it does not exist yet.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Store `chunks`, overwriting records with the same id.
    ///
    /// Every chunk must carry an embedding.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Drop every record of `document_id` and return how many were dropped.
    async fn remove_document(&self, collection: &str, document_id: &str) -> Result<usize>;

    /// Swap the records of `document_id` for `chunks`.
    ///
    /// Segments the new version no longer produces disappear with the rest.
    /// The default runs [`remove_document`](Self::remove_document) then
    /// [`upsert`](Self::upsert); stores that can do both under one lock
    /// should override it.
    async fn replace_document(&self, collection: &str, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        self.remove_document(collection, document_id).await?;
        self.upsert(collection, chunks).await
    }

    async fn count(&self, collection: &str) -> Result<usize>;

    /// The `top_k` records closest to `embedding`, best first.
    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;
}
