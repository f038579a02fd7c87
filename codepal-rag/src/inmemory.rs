//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `HashMap` behind a
//! `tokio::sync::RwLock`: searches run concurrently, upserts are exclusive.
//! Nothing is persisted beyond the process lifetime.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → chunk ID → chunk.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection '{collection}' does not exist"))
}

fn insert_all(store: &mut HashMap<String, Chunk>, chunks: &[Chunk]) -> Result<()> {
    if let Some(bare) = chunks.iter().find(|c| c.embedding.is_empty()) {
        return Err(RagError::store(BACKEND, format!("chunk '{}' has no embedding", bare.id)));
    }
    for chunk in chunks {
        store.insert(chunk.id.clone(), chunk.clone());
    }
    Ok(())
}

fn remove_by_document(store: &mut HashMap<String, Chunk>, document_id: &str) -> usize {
    let before = store.len();
    store.retain(|_, chunk| chunk.document_id != document_id);
    before - store.len()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        insert_all(store, chunks)?;
        debug!(collection, upserted = chunks.len(), total = store.len(), "upserted chunks");
        Ok(())
    }

    async fn remove_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(remove_by_document(store, document_id))
    }

    async fn replace_document(&self, collection: &str, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        // Validate before removing so a bad batch leaves the old version in place.
        if chunks.iter().any(|c| c.embedding.is_empty()) {
            return insert_all(store, chunks);
        }
        let removed = remove_by_document(store, document_id);
        insert_all(store, chunks)?;
        debug!(collection, document_id, removed, inserted = chunks.len(), "replaced document");
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(HashMap::len).ok_or_else(|| missing_collection(collection))
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<SearchResult> = store
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        // Ties broken by id so results are stable across runs.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
