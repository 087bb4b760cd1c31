//! Catalog engine orchestration.
//!
//! [`CatalogEngine`] coordinates index builds and query execution by
//! composing a [`TextNormalizer`], a [`CatalogSource`], a [`ResultCache`],
//! a [`ManifestStore`], an [`ArtifactStore`], an [`AuditLog`], and an
//! optional [`Reranker`]. Construct one via [`CatalogEngine::builder()`].
//!
//! Builds publish atomically with respect to readers: artifacts are fully
//! written before the manifest that points at them is created, and readers
//! resolve "current version" from the latest complete manifest. Every query
//! failure is converted at this boundary into a degraded response with a
//! generic message; internal detail is logged, never exposed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::artifact::{self, ArtifactStore};
use crate::assistant::AnswerSynthesizer;
use crate::audit::AuditLog;
use crate::cache::{cache_key, ResultCache};
use crate::catalog::CatalogSource;
use crate::chunking::SentenceChunker;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::manifest::{bump_version, current_version, ManifestStore, INITIAL_VERSION};
use crate::normalize::TextNormalizer;
use crate::product_index::{IndexedItem, ProductIndex};
use crate::rerank::{DiversityReranker, Reranker};
use crate::retrieval::RetrievalStore;
use crate::types::{
    AskResponse, CatalogItem, DocumentChunk, IndexManifest, RankedResponse, RetrievalResult,
    ScoredItem, SearchLogRecord, SourceDocument, SourceType,
};
use crate::vectorizer::TfidfVectorizer;

/// Manifest name of the product similarity index.
pub const PRODUCT_INDEX: &str = "product_index";
/// Manifest name of the retrieval (RAG) index.
pub const RAG_INDEX: &str = "rag_index";

const VOCABULARY_ARTIFACT: &str = "vocabulary.json";
const VECTORS_ARTIFACT: &str = "vectors.json";
const CHUNKS_ARTIFACT: &str = "chunks.json";

const RECOMMENDATIONS_UNAVAILABLE: &str = "Recommendations are currently unavailable.";
const SEARCH_UNAVAILABLE: &str = "Search is currently unavailable.";
const ASSISTANT_UNAVAILABLE: &str =
    "The assistant is currently unavailable. Please try again later.";

/// The catalog engine: builds indexes and serves recommend, search, and ask
/// queries with version-keyed caching and audit logging.
pub struct CatalogEngine {
    config: EngineConfig,
    normalizer: Arc<dyn TextNormalizer>,
    catalog: Arc<dyn CatalogSource>,
    cache: Arc<dyn ResultCache>,
    manifests: Arc<dyn ManifestStore>,
    artifacts: Arc<dyn ArtifactStore>,
    audit: Arc<dyn AuditLog>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: SentenceChunker,
    synthesizer: AnswerSynthesizer,
    product_index: RwLock<Option<ProductIndex>>,
    retrieval: RwLock<Option<RetrievalStore>>,
}

impl CatalogEngine {
    /// Create a new [`CatalogEngineBuilder`].
    pub fn builder() -> CatalogEngineBuilder {
        CatalogEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build (or skip) the product similarity index.
    ///
    /// When a build already exists and `force_rebuild` is false, returns the
    /// current version unchanged. Otherwise builds from `items`, writes the
    /// vocabulary and vector artifacts, bumps the version, publishes the
    /// manifest, swaps the live index, and clears the result cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] when no item is indexable and
    /// [`Error::Storage`] when artifacts cannot be written. No manifest is
    /// published on failure.
    pub async fn build_product_index(
        &self,
        items: &[CatalogItem],
        force_rebuild: bool,
    ) -> Result<String> {
        let latest = self.manifests.latest(PRODUCT_INDEX).await?;
        if !force_rebuild {
            if let Some(manifest) = &latest {
                info!(version = %manifest.version, "product index exists, skipping build");
                return Ok(manifest.version.clone());
            }
        }

        let index =
            ProductIndex::build(items, &*self.normalizer, self.config.vectorizer.clone())?;
        let item_count = index.len();

        // Every successful build increments, so the first published version
        // is one bump past the initial value.
        let version =
            bump_version(latest.as_ref().map_or(INITIAL_VERSION, |m| m.version.as_str()));
        let location = format!("{PRODUCT_INDEX}/{version}");

        let vocab_location = format!("{location}/{VOCABULARY_ARTIFACT}");
        let blob = artifact::encode(&vocab_location, index.vectorizer())?;
        self.artifacts.write(&vocab_location, &blob).await?;
        let vectors_location = format!("{location}/{VECTORS_ARTIFACT}");
        let blob = artifact::encode(&vectors_location, &index.items())?;
        self.artifacts.write(&vectors_location, &blob).await?;

        // Artifacts are complete; only now does the build become visible.
        self.manifests
            .create(IndexManifest {
                name: PRODUCT_INDEX.to_string(),
                version: version.clone(),
                created_at: Utc::now(),
                artifact_location: location,
                metadata: [
                    ("item_count".to_string(), serde_json::json!(item_count)),
                    ("vectorizer".to_string(), serde_json::json!("tfidf")),
                ]
                .into(),
            })
            .await?;

        *self.product_index.write().await = Some(index);
        self.invalidate_cache_after_build().await;

        info!(version, item_count, "product index built");
        Ok(version)
    }

    /// Build (or skip) the retrieval index from knowledge documents.
    ///
    /// Documents are chunked per source type in fixed order (FAQ, policy,
    /// item) and added group by group; the vectorizer is fitted on the first
    /// non-empty group. Same publish discipline as
    /// [`build_product_index`](Self::build_product_index).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] when `documents` yields no chunks.
    pub async fn build_knowledge_index(
        &self,
        documents: &[SourceDocument],
        force_rebuild: bool,
    ) -> Result<String> {
        let latest = self.manifests.latest(RAG_INDEX).await?;
        if !force_rebuild {
            if let Some(manifest) = &latest {
                info!(version = %manifest.version, "retrieval index exists, skipping build");
                return Ok(manifest.version.clone());
            }
        }

        let mut store = RetrievalStore::new(self.config.vectorizer.clone());
        for source_type in [SourceType::Faq, SourceType::Policy, SourceType::Item] {
            let mut chunks: Vec<DocumentChunk> = Vec::new();
            for doc in documents.iter().filter(|d| d.source_type == source_type) {
                let mut metadata = doc.metadata.clone();
                let keywords = self.normalizer.keywords(&doc.text, 10);
                if !keywords.is_empty() {
                    metadata.insert("keywords".to_string(), keywords.join(","));
                }
                chunks.extend(self.chunker.chunk(&doc.source_id, &doc.text, source_type, &metadata));
            }
            if !chunks.is_empty() {
                let added = chunks.len();
                store.add_documents(chunks, &*self.normalizer)?;
                info!(?source_type, added, "added chunks to retrieval index");
            }
        }

        if store.is_empty() {
            return Err(Error::Build("no documents to index".to_string()));
        }
        let chunk_count = store.len();

        let version =
            bump_version(latest.as_ref().map_or(INITIAL_VERSION, |m| m.version.as_str()));
        let location = format!("{RAG_INDEX}/{version}");

        let vocab_location = format!("{location}/{VOCABULARY_ARTIFACT}");
        let blob = artifact::encode(&vocab_location, store.vectorizer())?;
        self.artifacts.write(&vocab_location, &blob).await?;
        let chunks_location = format!("{location}/{CHUNKS_ARTIFACT}");
        let blob = artifact::encode(&chunks_location, &store.chunks())?;
        self.artifacts.write(&chunks_location, &blob).await?;

        self.manifests
            .create(IndexManifest {
                name: RAG_INDEX.to_string(),
                version: version.clone(),
                created_at: Utc::now(),
                artifact_location: location,
                metadata: [
                    ("chunk_count".to_string(), serde_json::json!(chunk_count)),
                    ("vectorizer".to_string(), serde_json::json!("tfidf")),
                ]
                .into(),
            })
            .await?;

        *self.retrieval.write().await = Some(store);
        self.invalidate_cache_after_build().await;

        info!(version, chunk_count, "retrieval index built");
        Ok(version)
    }

    /// Items most similar to `item_id`, diversity-reranked when a reranker
    /// is configured. Degrades to an empty response with a generic message
    /// when the index is unavailable.
    pub async fn recommend(&self, item_id: i64, k: usize) -> RankedResponse {
        let start = Instant::now();
        let version = self.version_or_initial(PRODUCT_INDEX).await;

        let mut params = BTreeMap::new();
        params.insert("item_id".to_string(), item_id.to_string());
        params.insert("k".to_string(), k.to_string());
        let key = cache_key("recommend", &params, &version);

        if let Some(mut hit) = self.cache_probe::<RankedResponse>(&key).await {
            hit.cached = true;
            hit.latency_ms = elapsed_ms(start);
            return hit;
        }

        match self.ranked_recommendations(item_id, k).await {
            Ok(results) => {
                let response = RankedResponse {
                    results,
                    index_version: version,
                    cached: false,
                    latency_ms: elapsed_ms(start),
                    error: None,
                };
                self.cache_fill(&key, &response).await;
                response
            }
            // Unknown ids yield an empty result, not an error. Not cached:
            // the item may appear in the next catalog read.
            Err(Error::UnknownEntity { kind, id }) => {
                warn!(kind, id = %id, "recommendation for unknown item");
                RankedResponse {
                    results: Vec::new(),
                    index_version: version,
                    cached: false,
                    latency_ms: elapsed_ms(start),
                    error: None,
                }
            }
            Err(e) => {
                error!(item_id, error = %e, "recommendation query degraded");
                degraded(version, elapsed_ms(start), RECOMMENDATIONS_UNAVAILABLE)
            }
        }
    }

    async fn ranked_recommendations(&self, item_id: i64, k: usize) -> Result<Vec<ScoredItem>> {
        self.ensure_product_index().await?;
        let catalog = self.catalog.items().await?;
        if !catalog.contains_key(&item_id) {
            return Err(Error::UnknownEntity { kind: "item", id: item_id.to_string() });
        }
        let guard = self.product_index.read().await;
        let index = guard.as_ref().ok_or(Error::NotFitted)?;
        let results = index.similar_items(item_id, k, &catalog);
        Ok(match &self.reranker {
            Some(reranker) => reranker.rerank(results, &catalog),
            None => results,
        })
    }

    /// Free-text search over the product index. Degrades like
    /// [`recommend`](Self::recommend); every served query is audit-logged.
    pub async fn search(&self, query: &str, k: usize) -> RankedResponse {
        let start = Instant::now();
        let version = self.version_or_initial(PRODUCT_INDEX).await;

        let mut params = BTreeMap::new();
        params.insert("q".to_string(), query.to_string());
        params.insert("k".to_string(), k.to_string());
        let key = cache_key("search", &params, &version);

        if let Some(mut hit) = self.cache_probe::<RankedResponse>(&key).await {
            hit.cached = true;
            hit.latency_ms = elapsed_ms(start);
            self.audit_query(query, &hit).await;
            return hit;
        }

        let response = match self.ranked_search(query, k).await {
            Ok(results) => {
                let response = RankedResponse {
                    results,
                    index_version: version,
                    cached: false,
                    latency_ms: elapsed_ms(start),
                    error: None,
                };
                self.cache_fill(&key, &response).await;
                response
            }
            Err(e) => {
                error!(query, error = %e, "search query degraded");
                degraded(version, elapsed_ms(start), SEARCH_UNAVAILABLE)
            }
        };
        self.audit_query(query, &response).await;
        response
    }

    async fn ranked_search(&self, query: &str, k: usize) -> Result<Vec<ScoredItem>> {
        self.ensure_product_index().await?;
        let catalog = self.catalog.items().await?;
        let guard = self.product_index.read().await;
        let index = guard.as_ref().ok_or(Error::NotFitted)?;
        Ok(index.search_by_text(query, k, &catalog, &*self.normalizer))
    }

    /// Answer a free-text question from the retrieval index.
    ///
    /// A blank question returns the fixed "could not understand" response
    /// without touching the cache or the retrieval store.
    pub async fn ask(&self, question: &str, max_sources: usize) -> AskResponse {
        let start = Instant::now();

        if question.trim().is_empty() {
            let answer = self.synthesizer.could_not_understand();
            return AskResponse {
                answer: answer.text,
                sources: answer.sources,
                confidence: 0.0,
                trace_id: None,
                index_version: self.version_or_initial(RAG_INDEX).await,
                cached: false,
                latency_ms: elapsed_ms(start),
            };
        }

        let version = self.version_or_initial(RAG_INDEX).await;
        let mut params = BTreeMap::new();
        params.insert("question".to_string(), question.to_string());
        params.insert("max_sources".to_string(), max_sources.to_string());
        let key = cache_key("ask", &params, &version);

        if let Some(mut hit) = self.cache_probe::<AskResponse>(&key).await {
            hit.cached = true;
            hit.latency_ms = elapsed_ms(start);
            self.audit_ask(question, &hit).await;
            return hit;
        }

        let response = match self.retrieved_passages(question, max_sources).await {
            Ok(results) => {
                let answer = self.synthesizer.answer(question, &results);
                let response = AskResponse {
                    answer: answer.text,
                    sources: answer.sources,
                    confidence: answer.confidence,
                    trace_id: answer.trace_id,
                    index_version: version,
                    cached: false,
                    latency_ms: elapsed_ms(start),
                };
                self.cache_fill(&key, &response).await;
                response
            }
            Err(e) => {
                error!(question, error = %e, "ask query degraded");
                AskResponse {
                    answer: ASSISTANT_UNAVAILABLE.to_string(),
                    sources: Vec::new(),
                    confidence: 0.0,
                    trace_id: None,
                    index_version: version,
                    cached: false,
                    latency_ms: elapsed_ms(start),
                }
            }
        };
        self.audit_ask(question, &response).await;
        response
    }

    async fn retrieved_passages(
        &self,
        question: &str,
        max_sources: usize,
    ) -> Result<Vec<RetrievalResult>> {
        self.ensure_retrieval_index().await?;
        let guard = self.retrieval.read().await;
        let store = guard.as_ref().ok_or(Error::NotFitted)?;
        Ok(store.search(
            question,
            max_sources,
            self.config.min_retrieval_score,
            &*self.normalizer,
        ))
    }

    /// Conservative full cache reset after an item edit or deletion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when the cache backend fails.
    pub async fn record_item_change(&self, item_id: i64) -> Result<()> {
        info!(item_id, "invalidating result cache after item change");
        self.cache.invalidate_all().await
    }

    /// Lazily restore the live product index from the latest artifacts.
    async fn ensure_product_index(&self) -> Result<()> {
        if self.product_index.read().await.is_some() {
            return Ok(());
        }
        let manifest =
            self.manifests.latest(PRODUCT_INDEX).await?.ok_or(Error::NotFitted)?;
        let vocab_location =
            format!("{}/{VOCABULARY_ARTIFACT}", manifest.artifact_location);
        let bytes = self.artifacts.read(&vocab_location).await?;
        let vectorizer: TfidfVectorizer = artifact::decode(&vocab_location, &bytes)?;
        let vectors_location = format!("{}/{VECTORS_ARTIFACT}", manifest.artifact_location);
        let bytes = self.artifacts.read(&vectors_location).await?;
        let items: Vec<IndexedItem> = artifact::decode(&vectors_location, &bytes)?;

        info!(version = %manifest.version, "product index loaded from artifacts");
        *self.product_index.write().await = Some(ProductIndex::from_parts(vectorizer, items));
        Ok(())
    }

    /// Lazily restore the live retrieval store from the latest artifacts.
    async fn ensure_retrieval_index(&self) -> Result<()> {
        if self.retrieval.read().await.is_some() {
            return Ok(());
        }
        let manifest = self.manifests.latest(RAG_INDEX).await?.ok_or(Error::NotFitted)?;
        let vocab_location =
            format!("{}/{VOCABULARY_ARTIFACT}", manifest.artifact_location);
        let bytes = self.artifacts.read(&vocab_location).await?;
        let vectorizer: TfidfVectorizer = artifact::decode(&vocab_location, &bytes)?;
        let chunks_location = format!("{}/{CHUNKS_ARTIFACT}", manifest.artifact_location);
        let bytes = self.artifacts.read(&chunks_location).await?;
        let chunks: Vec<DocumentChunk> = artifact::decode(&chunks_location, &bytes)?;

        info!(version = %manifest.version, "retrieval index loaded from artifacts");
        *self.retrieval.write().await = Some(RetrievalStore::from_parts(vectorizer, chunks));
        Ok(())
    }

    async fn version_or_initial(&self, name: &str) -> String {
        match current_version(&*self.manifests, name).await {
            Ok(version) => version,
            Err(e) => {
                warn!(name, error = %e, "could not resolve index version");
                INITIAL_VERSION.to_string()
            }
        }
    }

    async fn cache_probe<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn cache_fill<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                if let Err(e) = self.cache.set(key, value, self.config.cache_ttl_secs).await {
                    warn!(key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "could not serialize response for caching"),
        }
    }

    async fn invalidate_cache_after_build(&self) {
        if let Err(e) = self.cache.invalidate_all().await {
            warn!(error = %e, "cache invalidation after build failed");
        }
    }

    async fn audit_query(&self, query: &str, response: &RankedResponse) {
        let record = SearchLogRecord::new(
            query,
            response.results.len(),
            response.results.iter().map(|r| r.score).collect(),
            response.index_version.clone(),
            response.latency_ms,
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(error = %e, "audit append failed");
        }
    }

    async fn audit_ask(&self, question: &str, response: &AskResponse) {
        let record = SearchLogRecord::new(
            question,
            response.sources.len(),
            response.sources.iter().map(|s| s.score).collect(),
            response.index_version.clone(),
            response.latency_ms,
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(error = %e, "audit append failed");
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn degraded(index_version: String, latency_ms: u64, message: &str) -> RankedResponse {
    RankedResponse {
        results: Vec::new(),
        index_version,
        cached: false,
        latency_ms,
        error: Some(message.to_string()),
    }
}

/// Builder for constructing a [`CatalogEngine`].
///
/// All collaborators except `reranker` are required; `config` defaults to
/// [`EngineConfig::default()`].
#[derive(Default)]
pub struct CatalogEngineBuilder {
    config: Option<EngineConfig>,
    normalizer: Option<Arc<dyn TextNormalizer>>,
    catalog: Option<Arc<dyn CatalogSource>>,
    cache: Option<Arc<dyn ResultCache>>,
    manifests: Option<Arc<dyn ManifestStore>>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    audit: Option<Arc<dyn AuditLog>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl CatalogEngineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the text normalizer.
    pub fn normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Set the catalog source.
    pub fn catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the result cache handle.
    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the manifest store.
    pub fn manifests(mut self, manifests: Arc<dyn ManifestStore>) -> Self {
        self.manifests = Some(manifests);
        self
    }

    /// Set the artifact store.
    pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Set the audit log.
    pub fn audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the recommendation reranker.
    ///
    /// When unset, a [`DiversityReranker`] driven by the configured
    /// `diversity_weight` is used (none at all when the weight is zero).
    /// Pass a [`NoOpReranker`](crate::rerank::NoOpReranker) to disable
    /// reranking regardless of the weight.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`CatalogEngine`], validating that all required
    /// collaborators are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required collaborator is missing.
    pub fn build(self) -> Result<CatalogEngine> {
        let config = self.config.unwrap_or_default();
        let normalizer = self
            .normalizer
            .ok_or_else(|| Error::Config("normalizer is required".to_string()))?;
        let catalog =
            self.catalog.ok_or_else(|| Error::Config("catalog is required".to_string()))?;
        let cache = self.cache.ok_or_else(|| Error::Config("cache is required".to_string()))?;
        let manifests = self
            .manifests
            .ok_or_else(|| Error::Config("manifest store is required".to_string()))?;
        let artifacts = self
            .artifacts
            .ok_or_else(|| Error::Config("artifact store is required".to_string()))?;
        let audit =
            self.audit.ok_or_else(|| Error::Config("audit log is required".to_string()))?;

        let reranker = self.reranker.or_else(|| {
            (config.diversity_weight > 0.0).then(|| {
                Arc::new(DiversityReranker::new(config.diversity_weight)) as Arc<dyn Reranker>
            })
        });
        let chunker =
            SentenceChunker::new(config.chunk_max_chars, config.chunk_overlap_words);
        let synthesizer = AnswerSynthesizer::new(config.max_answer_chars);

        Ok(CatalogEngine {
            config,
            normalizer,
            catalog,
            cache,
            manifests,
            artifacts,
            audit,
            reranker,
            chunker,
            synthesizer,
            product_index: RwLock::new(None),
            retrieval: RwLock::new(None),
        })
    }
}
