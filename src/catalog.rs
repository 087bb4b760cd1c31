//! Catalog store seam.
//!
//! The catalog database is an external collaborator: it supplies item
//! records on demand and the core never mutates it.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::CatalogItem;

/// A read-only source of catalog item records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All item records, keyed by id.
    async fn items(&self) -> Result<HashMap<i64, CatalogItem>>;
}

/// A catalog source over a fixed (replaceable) set of items.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    items: RwLock<HashMap<i64, CatalogItem>>,
}

impl StaticCatalog {
    /// Create a catalog holding the given items.
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items: RwLock::new(items.into_iter().map(|i| (i.id, i)).collect()) }
    }

    /// Replace the full item set.
    pub async fn replace(&self, items: Vec<CatalogItem>) {
        *self.items.write().await = items.into_iter().map(|i| (i.id, i)).collect();
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn items(&self) -> Result<HashMap<i64, CatalogItem>> {
        Ok(self.items.read().await.clone())
    }
}
