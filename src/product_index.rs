//! Product similarity index over catalog item text.
//!
//! Items are vectorized from their name, description, and category; the
//! index answers "most similar to item X" and free-text search queries.
//! Ranked candidates are filtered to active, in-stock items **before**
//! truncating to `k`, so eligibility filtering never under-fills results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VectorizerConfig;
use crate::error::{Error, Result};
use crate::normalize::TextNormalizer;
use crate::types::{CatalogItem, ScoredItem, TermVector};
use crate::vectorizer::TfidfVectorizer;

/// An item id with its term vector; owned exclusively by the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedItem {
    /// The catalog item id.
    pub id: i64,
    /// The item's term vector.
    pub vector: TermVector,
}

/// A fitted similarity index over indexable catalog items.
///
/// Indexable means active with non-empty normalized text; other items are
/// silently excluded at build time.
#[derive(Debug, Clone)]
pub struct ProductIndex {
    vectorizer: TfidfVectorizer,
    items: Vec<IndexedItem>,
}

impl ProductIndex {
    /// Build an index over the indexable subset of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] when no item is indexable.
    pub fn build(
        items: &[CatalogItem],
        normalizer: &dyn TextNormalizer,
        config: VectorizerConfig,
    ) -> Result<Self> {
        let mut ids = Vec::new();
        let mut texts = Vec::new();
        for item in items {
            if !item.active {
                continue;
            }
            let text = normalizer
                .normalize(&format!("{} {} {}", item.name, item.description, item.category));
            if text.is_empty() {
                debug!(item.id, "skipping item with empty normalized text");
                continue;
            }
            ids.push(item.id);
            texts.push(text);
        }

        if ids.is_empty() {
            return Err(Error::Build("no indexable items in corpus".to_string()));
        }

        let mut vectorizer = TfidfVectorizer::new(config);
        vectorizer.fit(&texts)?;
        let vectors = vectorizer.transform(&texts)?;
        let items = ids
            .into_iter()
            .zip(vectors)
            .map(|(id, vector)| IndexedItem { id, vector })
            .collect();
        Ok(Self { vectorizer, items })
    }

    /// Reassemble an index from its persisted artifacts.
    pub fn from_parts(vectorizer: TfidfVectorizer, items: Vec<IndexedItem>) -> Self {
        Self { vectorizer, items }
    }

    /// The fitted vectorizer (the vocabulary artifact).
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// The indexed id/vector table (the vector artifact).
    pub fn items(&self) -> &[IndexedItem] {
        &self.items
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items most similar to `item_id`, excluding the item itself.
    ///
    /// Fails softly: returns an empty list when the id is not indexed.
    /// Candidates are filtered to active, in-stock entries of `catalog`
    /// before truncation to `k`. Ties break by ascending item id.
    pub fn similar_items(
        &self,
        item_id: i64,
        k: usize,
        catalog: &HashMap<i64, CatalogItem>,
    ) -> Vec<ScoredItem> {
        let Some(query) = self.items.iter().find(|it| it.id == item_id) else {
            debug!(item_id, "similar_items on unknown item id");
            return Vec::new();
        };
        self.rank(&query.vector, Some(item_id), k, catalog)
    }

    /// Items most similar to a free-text query. No self-exclusion.
    pub fn search_by_text(
        &self,
        query: &str,
        k: usize,
        catalog: &HashMap<i64, CatalogItem>,
        normalizer: &dyn TextNormalizer,
    ) -> Vec<ScoredItem> {
        let normalized = normalizer.normalize(query);
        match self.vectorizer.transform_one(&normalized) {
            Ok(vector) => self.rank(&vector, None, k, catalog),
            Err(_) => Vec::new(),
        }
    }

    fn rank(
        &self,
        query: &TermVector,
        exclude: Option<i64>,
        k: usize,
        catalog: &HashMap<i64, CatalogItem>,
    ) -> Vec<ScoredItem> {
        let mut scored: Vec<ScoredItem> = self
            .items
            .iter()
            .filter(|it| Some(it.id) != exclude)
            .map(|it| ScoredItem { id: it.id, score: TfidfVectorizer::similarity(query, &it.vector) })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        // Eligibility filter runs on the full ranked list, then truncate.
        scored.retain(|s| {
            catalog.get(&s.id).is_some_and(|item| item.active && item.stock > 0)
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SimpleNormalizer;

    fn item(id: i64, name: &str, description: &str, category: &str, stock: u32) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            price: 100.0,
            active: true,
            stock,
        }
    }

    fn sample_items() -> Vec<CatalogItem> {
        vec![
            item(1, "Gaming laptop", "powerful gaming laptop fast graphics", "computers", 5),
            item(2, "Office laptop", "reliable office laptop work documents", "computers", 3),
            item(3, "Smartphone", "android smartphone bright camera", "phones", 8),
            item(4, "Budget phone", "android phone budget camera", "phones", 2),
        ]
    }

    fn catalog(items: &[CatalogItem]) -> HashMap<i64, CatalogItem> {
        items.iter().map(|i| (i.id, i.clone())).collect()
    }

    fn build(items: &[CatalogItem]) -> ProductIndex {
        ProductIndex::build(items, &SimpleNormalizer::new(), VectorizerConfig::default()).unwrap()
    }

    #[test]
    fn build_fails_on_entirely_unindexable_corpus() {
        let mut items = sample_items();
        for it in &mut items {
            it.active = false;
        }
        let err = ProductIndex::build(&items, &SimpleNormalizer::new(), VectorizerConfig::default());
        assert!(matches!(err, Err(Error::Build(_))));
    }

    #[test]
    fn inactive_items_are_silently_excluded_at_build() {
        let mut items = sample_items();
        items[3].active = false;
        let index = build(&items);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn similar_items_excludes_the_query_item() {
        let items = sample_items();
        let index = build(&items);
        let results = index.similar_items(1, 10, &catalog(&items));
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.id != 1));
    }

    #[test]
    fn unknown_item_id_fails_softly() {
        let items = sample_items();
        let index = build(&items);
        assert!(index.similar_items(999, 5, &catalog(&items)).is_empty());
    }

    #[test]
    fn results_never_exceed_k() {
        let items = sample_items();
        let index = build(&items);
        let results = index.search_by_text("laptop", 2, &catalog(&items), &SimpleNormalizer::new());
        assert!(results.len() <= 2);
    }

    #[test]
    fn out_of_stock_items_are_filtered_before_truncation() {
        let mut items = sample_items();
        // Best match for "laptop" is out of stock; k=1 must still fill from
        // the next eligible candidate instead of returning empty.
        items[0].stock = 0;
        let index = build(&items);
        let results = index.search_by_text(
            "gaming laptop",
            1,
            &catalog(&items),
            &SimpleNormalizer::new(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn search_ranks_matching_category_first() {
        let items = sample_items();
        let index = build(&items);
        let results =
            index.search_by_text("android camera", 4, &catalog(&items), &SimpleNormalizer::new());
        assert!(results.len() >= 2);
        assert!([3, 4].contains(&results[0].id));
        assert!([3, 4].contains(&results[1].id));
    }
}
