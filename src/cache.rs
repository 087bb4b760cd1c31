//! Version-keyed result caching.
//!
//! Cache keys hash the operation kind, the sorted query parameters, and the
//! current index version, so a rebuild makes every stale entry unreachable
//! without touching the cache. [`ResultCache::invalidate_all`] exists for
//! explicit full resets (e.g. after an item edit); there is deliberately no
//! pattern-selective invalidation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// Compute a stable cache key for an operation.
///
/// Parameters are accepted as a `BTreeMap` so the hash input is already
/// sorted; the same parameters always produce the same key.
pub fn cache_key(
    operation: &str,
    params: &BTreeMap<String, String>,
    index_version: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"\n");
    hasher.update(index_version.as_bytes());
    hasher.update(b"\n");
    for (key, value) in params {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    format!("{operation}_{:x}", hasher.finalize())
}

/// Opaque storage for memoized query responses.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up a value. Returns `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store a value with a time-to-live in seconds.
    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> Result<()>;

    /// Clear every entry unconditionally.
    async fn invalidate_all(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// In-memory TTL cache backed by a `HashMap` behind a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet evicted) entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        // Write lock so expired entries are evicted on read.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> Result<()> {
        let ttl = Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at: Utc::now() + ttl });
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        let evicted = entries.len();
        entries.clear();
        debug!(evicted, "cache invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn same_inputs_produce_the_same_key() {
        let a = cache_key("search", &params(&[("q", "laptop"), ("k", "5")]), "1.0.1");
        let b = cache_key("search", &params(&[("k", "5"), ("q", "laptop")]), "1.0.1");
        assert_eq!(a, b);
    }

    #[test]
    fn version_change_produces_a_different_key() {
        let p = params(&[("q", "laptop"), ("k", "5")]);
        let a = cache_key("search", &p, "1.0.1");
        let b = cache_key("search", &p, "1.0.2");
        assert_ne!(a, b);
    }

    #[test]
    fn operation_kind_is_part_of_the_key() {
        let p = params(&[("q", "laptop")]);
        assert_ne!(cache_key("search", &p, "1.0.1"), cache_key("ask", &p, "1.0.1"));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k1", json!({"results": [1, 2]}), 60).await.unwrap();
        let value = cache.get("k1").await.unwrap();
        assert_eq!(value, Some(json!({"results": [1, 2]})));
    }

    #[tokio::test]
    async fn invalidate_all_misses_every_previous_key() {
        let cache = InMemoryCache::new();
        cache.set("k1", json!(1), 60).await.unwrap();
        cache.set("k2", json!(2), 60).await.unwrap();
        cache.invalidate_all().await.unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), None);
        assert_eq!(cache.get("k2").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_entries_expire_immediately() {
        let cache = InMemoryCache::new();
        cache.set("k1", json!(1), 0).await.unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), None);
    }
}
