//! Catalog indexing, similarity retrieval, and grounded question answering.
//!
//! This crate provides:
//! - TF-IDF vectorization over normalized catalog and knowledge text
//! - A product similarity index with active/in-stock result filtering
//! - Sentence chunking and score-floored passage retrieval
//! - Grounded answer synthesis with per-source-type grouping
//! - Versioned index manifests, persisted artifacts, and a version-keyed
//!   result cache with conservative invalidation
//! - An orchestrating [`CatalogEngine`] that degrades gracefully at the
//!   query boundary
//!
//! Storage, caching, and audit seams are traits with in-memory
//! implementations; production deployments supply their own backends.

pub mod artifact;
pub mod assistant;
pub mod audit;
pub mod cache;
pub mod catalog;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod normalize;
pub mod product_index;
pub mod rerank;
pub mod retrieval;
pub mod types;
pub mod vectorizer;

pub use artifact::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
pub use assistant::{Answer, AnswerSynthesizer};
pub use audit::{AuditLog, InMemoryAuditLog};
pub use cache::{cache_key, InMemoryCache, ResultCache};
pub use catalog::{CatalogSource, StaticCatalog};
pub use chunking::SentenceChunker;
pub use config::{EngineConfig, EngineConfigBuilder, VectorizerConfig};
pub use engine::{CatalogEngine, CatalogEngineBuilder, PRODUCT_INDEX, RAG_INDEX};
pub use error::{Error, Result};
pub use manifest::{
    bump_version, current_version, InMemoryManifestStore, ManifestStore, INITIAL_VERSION,
};
pub use normalize::{SimpleNormalizer, TextNormalizer};
pub use product_index::{IndexedItem, ProductIndex};
pub use rerank::{DiversityReranker, NoOpReranker, Reranker};
pub use retrieval::RetrievalStore;
pub use types::{
    AskResponse, AskSource, CatalogItem, DocumentChunk, IndexManifest, RankedResponse,
    RetrievalResult, ScoredItem, SearchLogRecord, SourceDocument, SourceType, TermVector,
};
pub use vectorizer::{TfidfVectorizer, Vocabulary};
