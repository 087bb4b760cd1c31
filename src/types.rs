//! Data types for catalog items, term vectors, chunks, and responses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog item record as supplied by the catalog store.
///
/// The core never mutates item records; they are read for indexing and for
/// filtering query results to purchasable items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Unique item identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Category label used for diversity reranking.
    pub category: String,
    /// Unit price.
    pub price: f64,
    /// Whether the item is currently listed.
    pub active: bool,
    /// Units in stock. Out-of-stock items are filtered from query results.
    pub stock: u32,
}

/// A sparse term-weight vector over a fitted vocabulary.
///
/// Entries are `(term index, weight)` pairs sorted by term index, with
/// zero weights omitted. All vectors produced by one fitted vectorizer
/// share the same dimensionality and term ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TermVector {
    entries: Vec<(u32, f32)>,
}

impl TermVector {
    /// Build a vector from raw entries. Entries are sorted by term index
    /// and zero or negative weights are dropped.
    pub fn from_entries(mut entries: Vec<(u32, f32)>) -> Self {
        entries.retain(|(_, w)| *w > 0.0);
        entries.sort_by_key(|(idx, _)| *idx);
        Self { entries }
    }

    /// The non-zero `(term index, weight)` entries, sorted by term index.
    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }

    /// True if the vector has no non-zero weight.
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dot product with another sparse vector (merge walk over sorted entries).
    pub fn dot(&self, other: &Self) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f64;
        while i < self.entries.len() && j < other.entries.len() {
            match self.entries[i].0.cmp(&other.entries[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += f64::from(self.entries[i].1) * f64::from(other.entries[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| f64::from(*w) * f64::from(*w)).sum::<f64>().sqrt()
    }
}

/// The kind of source a document chunk was extracted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A frequently-asked-question entry.
    Faq,
    /// Store policy text.
    Policy,
    /// A catalog item description.
    Item,
}

/// A long-form source document to be chunked and indexed for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    /// Stable source identifier; chunk ids are derived from it.
    pub source_id: String,
    /// The raw document text.
    pub text: String,
    /// The kind of source this document came from.
    pub source_type: SourceType,
    /// Key-value metadata carried onto every chunk.
    pub metadata: HashMap<String, String>,
}

/// A bounded passage of a source document with provenance metadata.
///
/// Chunks are immutable once created; their lifetime is tied to one
/// retrieval store build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// `{source_id}_{sequence}` identifier, sequence starting at 0.
    pub id: String,
    /// The chunk text, including the word overlap from its predecessor.
    pub content: String,
    /// The kind of source this chunk came from.
    pub source_type: SourceType,
    /// Metadata inherited from the source document.
    pub metadata: HashMap<String, String>,
    /// The chunk's term vector. Empty until the retrieval store attaches one.
    pub vector: TermVector,
}

/// An item id paired with a similarity score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    /// The item id.
    pub id: i64,
    /// Cosine similarity in `[0, 1]` (higher is more similar).
    pub score: f32,
}

/// A retrieved chunk with its score and a human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The retrieved chunk.
    pub chunk: DocumentChunk,
    /// Cosine similarity between query and chunk.
    pub score: f32,
    /// Why this chunk matched: source, match strength, overlapping terms.
    pub explanation: String,
}

/// A versioned record pointing at one build of an index.
///
/// Exactly one manifest is "current" per name: the most recently created.
/// Manifests are never mutated, only superseded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// Index kind, e.g. `product_index` or `rag_index`.
    pub name: String,
    /// Dotted-triple version string, e.g. `1.0.3`.
    pub version: String,
    /// Creation timestamp; the newest manifest per name is current.
    pub created_at: DateTime<Utc>,
    /// Key prefix under which this build's artifacts were written.
    pub artifact_location: String,
    /// Build metadata (counts, vectorizer kind, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// An append-only audit record for a search or ask query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogRecord {
    /// Unique trace id for correlating with responses.
    pub trace_id: Uuid,
    /// The query or question text.
    pub query: String,
    /// Number of results returned.
    pub result_count: usize,
    /// Scores of the returned results, best first.
    pub top_scores: Vec<f32>,
    /// Index version the query ran against.
    pub index_version: String,
    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,
    /// When the query was served.
    pub created_at: DateTime<Utc>,
}

impl SearchLogRecord {
    /// Create a record with a fresh trace id and the current timestamp.
    pub fn new(
        query: impl Into<String>,
        result_count: usize,
        top_scores: Vec<f32>,
        index_version: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            query: query.into(),
            result_count,
            top_scores,
            index_version: index_version.into(),
            latency_ms,
            created_at: Utc::now(),
        }
    }
}

/// A ranked recommendation or search response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResponse {
    /// Ranked `(id, score)` results, best first.
    pub results: Vec<ScoredItem>,
    /// Index version the results were computed against.
    pub index_version: String,
    /// Whether this response was served from the result cache.
    pub cached: bool,
    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,
    /// Generic message when the query degraded (index unavailable).
    /// `None` on success. Internal error detail is logged, never exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A source citation attached to an assistant answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskSource {
    /// The cited chunk id.
    pub chunk_id: String,
    /// An excerpt of the chunk content (truncated for display).
    pub excerpt: String,
    /// The retrieval score of the chunk.
    pub score: f32,
    /// Why the chunk matched.
    pub explanation: String,
    /// Chunk metadata.
    pub metadata: HashMap<String, String>,
}

/// A question-answering response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// The assembled answer text.
    pub answer: String,
    /// Cited sources, best first.
    pub sources: Vec<AskSource>,
    /// Mean retrieval score of the cited sources; 0.0 with no sources.
    pub confidence: f32,
    /// Stable trace id derived from the question, for audit correlation.
    /// `None` for the fixed fallback responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Index version the answer was computed against.
    pub index_version: String,
    /// Whether this response was served from the result cache.
    pub cached: bool,
    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_vector_drops_zero_weights_and_sorts() {
        let v = TermVector::from_entries(vec![(3, 0.5), (1, 0.0), (0, 1.0)]);
        assert_eq!(v.entries(), &[(0, 1.0), (3, 0.5)]);
    }

    #[test]
    fn dot_product_over_disjoint_entries_is_zero() {
        let a = TermVector::from_entries(vec![(0, 1.0), (2, 1.0)]);
        let b = TermVector::from_entries(vec![(1, 1.0), (3, 1.0)]);
        assert_eq!(a.dot(&b), 0.0);
    }

    #[test]
    fn dot_product_matches_shared_entries() {
        let a = TermVector::from_entries(vec![(0, 2.0), (1, 3.0)]);
        let b = TermVector::from_entries(vec![(1, 4.0), (2, 5.0)]);
        assert!((a.dot(&b) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_has_zero_norm() {
        let v = TermVector::default();
        assert!(v.is_zero());
        assert_eq!(v.norm(), 0.0);
    }
}
