//! Query-side view of a [`RagPipeline`] collection.

use std::sync::Arc;

use tracing::debug;

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::pipeline::RagPipeline;

/// Retrieves the segments most relevant to a query from one collection.
///
/// Shares the pipeline's embedding provider, so queries and stored segments
/// are always embedded by the same model. `max_results` and `min_score`
/// default to the pipeline config and can be overridden per retriever.
///
/// # Example
///
/// ```rust,ignore
/// let retriever = ContentRetriever::builder(pipeline, "kb").min_score(0.6).build()?;
/// let results = retriever.retrieve("What should I learn after Java?").await?;
/// ```
#[derive(Clone)]
pub struct ContentRetriever {
    pipeline: Arc<RagPipeline>,
    collection: String,
    max_results: usize,
    min_score: f32,
}

impl std::fmt::Debug for ContentRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRetriever")
            .field("collection", &self.collection)
            .field("max_results", &self.max_results)
            .field("min_score", &self.min_score)
            .finish()
    }
}

impl ContentRetriever {
    /// Retriever using the pipeline's configured limits.
    pub fn new(pipeline: Arc<RagPipeline>, collection: impl Into<String>) -> Self {
        let config = pipeline.config();
        let (max_results, min_score) = (config.max_results, config.min_score);
        Self { pipeline, collection: collection.into(), max_results, min_score }
    }

    /// Start a builder to override the limits.
    pub fn builder(
        pipeline: Arc<RagPipeline>,
        collection: impl Into<String>,
    ) -> ContentRetrieverBuilder {
        ContentRetrieverBuilder { inner: Self::new(pipeline, collection) }
    }

    /// The collection this retriever searches.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Maximum number of results returned.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Minimum score a result needs to be returned.
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Embed `query`, search, and keep at most `max_results` results scoring
    /// at least `min_score`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let results = self
            .pipeline
            .query_with(&self.collection, query, self.max_results, self.min_score)
            .await?;
        debug!(collection = %self.collection, result_count = results.len(), "retrieved content");
        Ok(results)
    }
}

/// Builder for [`ContentRetriever`].
#[derive(Debug)]
pub struct ContentRetrieverBuilder {
    inner: ContentRetriever,
}

impl ContentRetrieverBuilder {
    /// Override the maximum number of results.
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.inner.max_results = max_results;
        self
    }

    /// Override the minimum score.
    pub fn min_score(mut self, min_score: f32) -> Self {
        self.inner.min_score = min_score;
        self
    }

    /// Validate and build the retriever.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `max_results` is zero or
    /// `min_score` is outside `0.0..=1.0`.
    pub fn build(self) -> Result<ContentRetriever> {
        if self.inner.max_results == 0 {
            return Err(RagError::ConfigError("max_results must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.inner.min_score) {
            return Err(RagError::ConfigError(format!(
                "min_score ({}) must be within 0.0..=1.0",
                self.inner.min_score
            )));
        }
        Ok(self.inner)
    }
}
