//! Index manifests and version management.
//!
//! Every successful build appends an immutable [`IndexManifest`]; the
//! "current" build of an index kind is the most recently created manifest
//! for that name. Caches derive validity from the current version, so a
//! version bump invalidates stale entries by construction.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Result;
use crate::types::IndexManifest;

/// The version reported for an index that has never been built.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Append-only storage for index manifests.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// The most recently created manifest for `name`, if any.
    async fn latest(&self, name: &str) -> Result<Option<IndexManifest>>;

    /// Append a manifest. Existing manifests are never mutated.
    async fn create(&self, manifest: IndexManifest) -> Result<()>;
}

/// The current version for an index kind: the latest manifest's version,
/// or [`INITIAL_VERSION`] if none exists.
pub async fn current_version(store: &dyn ManifestStore, name: &str) -> Result<String> {
    Ok(store
        .latest(name)
        .await?
        .map_or_else(|| INITIAL_VERSION.to_string(), |m| m.version))
}

/// Bump the last component of a dotted-triple version string.
///
/// Falls back to the input unchanged (with a warning) when the version does
/// not parse as a dotted triple. Never fails.
pub fn bump_version(version: &str) -> String {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() == 3 {
        if let Ok(patch) = parts[2].parse::<u64>() {
            return format!("{}.{}.{}", parts[0], parts[1], patch + 1);
        }
    }
    warn!(version, "could not parse index version, keeping current value");
    version.to_string()
}

/// In-memory manifest store backed by an append-only list per name.
#[derive(Debug, Default)]
pub struct InMemoryManifestStore {
    manifests: RwLock<HashMap<String, Vec<IndexManifest>>>,
}

impl InMemoryManifestStore {
    /// Create an empty manifest store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
    async fn latest(&self, name: &str) -> Result<Option<IndexManifest>> {
        let manifests = self.manifests.read().await;
        Ok(manifests.get(name).and_then(|list| list.last().cloned()))
    }

    async fn create(&self, manifest: IndexManifest) -> Result<()> {
        let mut manifests = self.manifests.write().await;
        manifests.entry(manifest.name.clone()).or_default().push(manifest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn manifest(name: &str, version: &str) -> IndexManifest {
        IndexManifest {
            name: name.to_string(),
            version: version.to_string(),
            created_at: Utc::now(),
            artifact_location: format!("{name}/{version}"),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn bump_increments_the_last_component() {
        assert_eq!(bump_version("1.0.0"), "1.0.1");
        assert_eq!(bump_version("2.3.9"), "2.3.10");
    }

    #[test]
    fn bump_falls_back_on_malformed_versions() {
        assert_eq!(bump_version("abc"), "abc");
        assert_eq!(bump_version("1.0"), "1.0");
        assert_eq!(bump_version("1.0.x"), "1.0.x");
    }

    #[tokio::test]
    async fn unbuilt_index_reports_initial_version() {
        let store = InMemoryManifestStore::new();
        let version = current_version(&store, "product_index").await.unwrap();
        assert_eq!(version, INITIAL_VERSION);
    }

    #[tokio::test]
    async fn latest_manifest_wins() {
        let store = InMemoryManifestStore::new();
        store.create(manifest("product_index", "1.0.1")).await.unwrap();
        store.create(manifest("product_index", "1.0.2")).await.unwrap();
        store.create(manifest("rag_index", "1.0.1")).await.unwrap();

        let version = current_version(&store, "product_index").await.unwrap();
        assert_eq!(version, "1.0.2");
        let version = current_version(&store, "rag_index").await.unwrap();
        assert_eq!(version, "1.0.1");
    }
}
