//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum segment size in characters.
    pub max_segment_size: usize,
    /// Maximum number of characters shared by consecutive segments.
    pub max_overlap_size: usize,
    /// Maximum number of results returned by a query.
    pub max_results: usize,
    /// Minimum similarity score for results (results below this are filtered out).
    pub min_score: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { max_segment_size: 1000, max_overlap_size: 200, max_results: 5, min_score: 0.75 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum segment size in characters.
    pub fn max_segment_size(mut self, size: usize) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the maximum overlap between consecutive segments in characters.
    pub fn max_overlap_size(mut self, overlap: usize) -> Self {
        self.config.max_overlap_size = overlap;
        self
    }

    /// Set the maximum number of results returned by a query.
    pub fn max_results(mut self, k: usize) -> Self {
        self.config.max_results = k;
        self
    }

    /// Set the minimum similarity score for filtering results.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = score;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `max_segment_size == 0`
    /// - `max_overlap_size >= max_segment_size`
    /// - `max_results == 0`
    /// - `min_score` is outside `0.0..=1.0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.max_segment_size == 0 {
            return Err(RagError::ConfigError(
                "max_segment_size must be greater than zero".to_string(),
            ));
        }
        if self.config.max_overlap_size >= self.config.max_segment_size {
            return Err(RagError::ConfigError(format!(
                "max_overlap_size ({}) must be less than max_segment_size ({})",
                self.config.max_overlap_size, self.config.max_segment_size
            )));
        }
        if self.config.max_results == 0 {
            return Err(RagError::ConfigError("max_results must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.config.min_score) {
            return Err(RagError::ConfigError(format!(
                "min_score ({}) must be within 0.0..=1.0",
                self.config.min_score
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_knowledge_base_settings() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.max_segment_size, 1000);
        assert_eq!(config.max_overlap_size, 200);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.min_score, 0.75);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_segment() {
        let err = RagConfig::builder().max_segment_size(100).max_overlap_size(100).build();
        assert!(matches!(err, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_results_and_bad_score() {
        assert!(RagConfig::builder().max_results(0).build().is_err());
        assert!(RagConfig::builder().min_score(1.5).build().is_err());
        assert!(RagConfig::builder().min_score(-0.1).build().is_err());
    }
}
