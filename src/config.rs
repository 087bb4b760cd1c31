//! Configuration for the catalog engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Vocabulary and weighting parameters for the term-weight vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorizerConfig {
    /// Maximum vocabulary size. When more terms qualify, the highest
    /// document-frequency terms are kept (lexicographic tie-break).
    pub max_features: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Terms present in at least this fraction of documents are dropped.
    pub max_df_fraction: f32,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { max_features: 1000, min_df: 1, max_df_fraction: 0.8 }
    }
}

/// Configuration parameters for the catalog engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Vectorizer parameters shared by both index kinds.
    pub vectorizer: VectorizerConfig,
    /// Maximum chunk size in characters.
    pub chunk_max_chars: usize,
    /// Word-level overlap between consecutive chunks.
    pub chunk_overlap_words: usize,
    /// Minimum retrieval score; passages below it are discarded.
    pub min_retrieval_score: f32,
    /// Diversity weight in `[0, 1]` for recommendation reranking.
    pub diversity_weight: f32,
    /// Result cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Hard cap on assembled answer length, in characters.
    pub max_answer_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            chunk_max_chars: 500,
            chunk_overlap_words: 50,
            min_retrieval_score: 0.2,
            diversity_weight: 0.3,
            cache_ttl_secs: 3600,
            max_answer_chars: 1000,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the maximum vocabulary size.
    pub fn max_features(mut self, n: usize) -> Self {
        self.config.vectorizer.max_features = n;
        self
    }

    /// Set the minimum document frequency for vocabulary terms.
    pub fn min_df(mut self, n: usize) -> Self {
        self.config.vectorizer.min_df = n;
        self
    }

    /// Set the maximum document-frequency fraction for vocabulary terms.
    pub fn max_df_fraction(mut self, f: f32) -> Self {
        self.config.vectorizer.max_df_fraction = f;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_max_chars(mut self, n: usize) -> Self {
        self.config.chunk_max_chars = n;
        self
    }

    /// Set the word-level overlap between consecutive chunks.
    pub fn chunk_overlap_words(mut self, n: usize) -> Self {
        self.config.chunk_overlap_words = n;
        self
    }

    /// Set the minimum retrieval score floor.
    pub fn min_retrieval_score(mut self, f: f32) -> Self {
        self.config.min_retrieval_score = f;
        self
    }

    /// Set the diversity weight for recommendation reranking.
    pub fn diversity_weight(mut self, f: f32) -> Self {
        self.config.diversity_weight = f;
        self
    }

    /// Set the result cache time-to-live in seconds.
    pub fn cache_ttl_secs(mut self, n: u64) -> Self {
        self.config.cache_ttl_secs = n;
        self
    }

    /// Set the hard cap on assembled answer length.
    pub fn max_answer_chars(mut self, n: usize) -> Self {
        self.config.max_answer_chars = n;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - `max_features == 0` or `chunk_max_chars == 0` or `max_answer_chars == 0`
    /// - `max_df_fraction` is not in `(0, 1]`
    /// - `min_retrieval_score` or `diversity_weight` is not in `[0, 1]`
    pub fn build(self) -> Result<EngineConfig> {
        let c = &self.config;
        if c.vectorizer.max_features == 0 {
            return Err(Error::Config("max_features must be greater than zero".to_string()));
        }
        if c.vectorizer.max_df_fraction <= 0.0 || c.vectorizer.max_df_fraction > 1.0 {
            return Err(Error::Config(format!(
                "max_df_fraction ({}) must be in (0, 1]",
                c.vectorizer.max_df_fraction
            )));
        }
        if c.chunk_max_chars == 0 {
            return Err(Error::Config("chunk_max_chars must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&c.min_retrieval_score) {
            return Err(Error::Config(format!(
                "min_retrieval_score ({}) must be in [0, 1]",
                c.min_retrieval_score
            )));
        }
        if !(0.0..=1.0).contains(&c.diversity_weight) {
            return Err(Error::Config(format!(
                "diversity_weight ({}) must be in [0, 1]",
                c.diversity_weight
            )));
        }
        if c.max_answer_chars == 0 {
            return Err(Error::Config("max_answer_chars must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}
