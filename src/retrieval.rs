//! Passage retrieval over document chunks.
//!
//! The store holds every chunk with its term vector and answers floored
//! top-k retrieval. The vectorizer is fitted on the first
//! [`add_documents`](RetrievalStore::add_documents) call only; later
//! additions vectorize against the frozen vocabulary, so terms unseen at
//! fit time carry zero weight in those chunks. Known limitation, kept for
//! build-order compatibility; a full rebuild refits from scratch.

use tracing::debug;

use crate::config::VectorizerConfig;
use crate::error::Result;
use crate::normalize::TextNormalizer;
use crate::types::{DocumentChunk, RetrievalResult, SourceType};
use crate::vectorizer::TfidfVectorizer;

/// Qualitative similarity bands used in result explanations.
fn similarity_band(score: f32) -> &'static str {
    if score > 0.8 {
        "very strong match"
    } else if score > 0.6 {
        "strong match"
    } else if score > 0.4 {
        "moderate match"
    } else {
        "weak match"
    }
}

/// A store of vectorized document chunks with top-k retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalStore {
    vectorizer: TfidfVectorizer,
    chunks: Vec<DocumentChunk>,
}

impl RetrievalStore {
    /// Create an empty store with an unfitted vectorizer.
    pub fn new(config: VectorizerConfig) -> Self {
        Self { vectorizer: TfidfVectorizer::new(config), chunks: Vec::new() }
    }

    /// Reassemble a store from its persisted artifacts.
    pub fn from_parts(vectorizer: TfidfVectorizer, chunks: Vec<DocumentChunk>) -> Self {
        Self { vectorizer, chunks }
    }

    /// The fitted vectorizer (the vocabulary artifact).
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// The stored chunks (the vector artifact).
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Append chunks, vectorizing their content.
    ///
    /// Fits the vectorizer if this is the first addition; otherwise the
    /// existing vocabulary is reused unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`](crate::Error::Build) when the first addition
    /// yields no vocabulary terms.
    pub fn add_documents(
        &mut self,
        mut chunks: Vec<DocumentChunk>,
        normalizer: &dyn TextNormalizer,
    ) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let processed: Vec<String> =
            chunks.iter().map(|c| normalizer.normalize(&c.content)).collect();
        if !self.vectorizer.is_fitted() {
            self.vectorizer.fit(&processed)?;
        }
        let vectors = self.vectorizer.transform(&processed)?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.vector = vector;
        }
        debug!(added = chunks.len(), total = self.chunks.len() + chunks.len(), "added chunks");
        self.chunks.extend(chunks);
        Ok(())
    }

    /// Retrieve the `top_k` chunks scoring at least `min_score` against the
    /// query, best first. Ties keep insertion order. Returns an empty list
    /// when nothing is indexed.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        normalizer: &dyn TextNormalizer,
    ) -> Vec<RetrievalResult> {
        if self.chunks.is_empty() || !self.vectorizer.is_fitted() {
            return Vec::new();
        }
        let normalized = normalizer.normalize(query);
        let Ok(query_vector) = self.vectorizer.transform_one(&normalized) else {
            return Vec::new();
        };

        let mut results: Vec<RetrievalResult> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let score = TfidfVectorizer::similarity(&query_vector, &chunk.vector);
                if score < min_score {
                    return None;
                }
                Some(RetrievalResult {
                    chunk: chunk.clone(),
                    score,
                    explanation: explain(query, chunk, score),
                })
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        results
    }
}

/// Build a human-readable explanation for one retrieval result.
fn explain(query: &str, chunk: &DocumentChunk, score: f32) -> String {
    let mut parts = Vec::with_capacity(3);

    parts.push(match chunk.source_type {
        SourceType::Faq => "Found in the FAQ".to_string(),
        SourceType::Policy => "Found in the store policies".to_string(),
        SourceType::Item => {
            let name = chunk.metadata.get("name").map_or("Product", String::as_str);
            format!("Found in the product description: {name}")
        }
    });

    parts.push(similarity_band(score).to_string());

    let chunk_words: std::collections::HashSet<String> =
        chunk.content.to_lowercase().split_whitespace().map(str::to_string).collect();
    let mut overlap = Vec::new();
    for word in query.to_lowercase().split_whitespace() {
        if chunk_words.contains(word) && !overlap.contains(&word.to_string()) {
            overlap.push(word.to_string());
            if overlap.len() == 3 {
                break;
            }
        }
    }
    if !overlap.is_empty() {
        parts.push(format!("matching terms: {}", overlap.join(", ")));
    }

    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::normalize::SimpleNormalizer;
    use crate::types::TermVector;

    fn chunk(id: &str, content: &str, source_type: SourceType) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            content: content.to_string(),
            source_type,
            metadata: HashMap::new(),
            vector: TermVector::default(),
        }
    }

    fn store_with(chunks: Vec<DocumentChunk>) -> RetrievalStore {
        let mut store = RetrievalStore::new(VectorizerConfig::default());
        store.add_documents(chunks, &SimpleNormalizer::new()).unwrap();
        store
    }

    #[test]
    fn empty_store_returns_no_results() {
        let store = RetrievalStore::new(VectorizerConfig::default());
        assert!(store.search("refund", 5, 0.0, &SimpleNormalizer::new()).is_empty());
    }

    #[test]
    fn search_respects_the_score_floor() {
        let store = store_with(vec![
            chunk("faq_0", "Refunds are processed within five business days", SourceType::Faq),
            chunk("policy_0", "Warranty covers manufacturing defects", SourceType::Policy),
        ]);
        let results = store.search("refund processed", 5, 0.95, &SimpleNormalizer::new());
        assert!(results.is_empty());
        let results = store.search("refund processed", 5, 0.1, &SimpleNormalizer::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "faq_0");
    }

    #[test]
    fn results_are_ordered_by_descending_score_and_bounded_by_top_k() {
        let store = store_with(vec![
            chunk("faq_0", "Shipping costs depend on the destination country", SourceType::Faq),
            chunk("faq_1", "Shipping is free above fifty euros", SourceType::Faq),
            chunk("policy_0", "Returns accepted within thirty days", SourceType::Policy),
        ]);
        let results = store.search("shipping costs", 2, 0.0, &SimpleNormalizer::new());
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn second_add_reuses_the_first_vocabulary() {
        let mut store = store_with(vec![
            chunk("faq_0", "Delivery takes three days", SourceType::Faq),
            chunk("faq_1", "Returns need a receipt", SourceType::Faq),
        ]);
        store
            .add_documents(
                vec![chunk("policy_0", "Quantum blender warranty", SourceType::Policy)],
                &SimpleNormalizer::new(),
            )
            .unwrap();
        // Terms unseen at fit time carry zero weight.
        let added = store.chunks().last().unwrap();
        assert!(added.vector.is_zero());
    }

    #[test]
    fn explanation_names_source_band_and_overlap() {
        let store = store_with(vec![
            chunk("faq_0", "Refunds are processed within five days", SourceType::Faq),
            chunk("faq_1", "Contact support for oversized parcels", SourceType::Faq),
        ]);
        let results = store.search("refunds processed when", 1, 0.0, &SimpleNormalizer::new());
        let explanation = &results[0].explanation;
        assert!(explanation.contains("Found in the FAQ"));
        assert!(explanation.contains("match"));
        assert!(explanation.contains("refunds"));
    }
}
