//! Reranking of similarity-ranked candidates.
//!
//! [`DiversityReranker`] greedily reorders candidates to trade similarity
//! against category diversity, measured as normalized Shannon entropy over
//! the categories of the selected items.

use std::collections::HashMap;

use crate::types::{CatalogItem, ScoredItem};

/// A reranker that reorders similarity-ranked candidates.
pub trait Reranker: Send + Sync {
    /// Reorder candidates, consulting catalog records for item attributes.
    fn rerank(
        &self,
        candidates: Vec<ScoredItem>,
        catalog: &HashMap<i64, CatalogItem>,
    ) -> Vec<ScoredItem>;
}

/// A no-op reranker that returns candidates unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

impl Reranker for NoOpReranker {
    fn rerank(
        &self,
        candidates: Vec<ScoredItem>,
        _catalog: &HashMap<i64, CatalogItem>,
    ) -> Vec<ScoredItem> {
        candidates
    }
}

/// Greedy entropy-based diversity reranker.
///
/// The top-similarity candidate is always kept first. Each following slot
/// picks the remaining candidate maximizing
/// `(1 - weight) * similarity + weight * diversity(selected + candidate)`,
/// with ties broken by original rank order.
#[derive(Debug, Clone, Copy)]
pub struct DiversityReranker {
    weight: f32,
}

impl DiversityReranker {
    /// Create a reranker with the given diversity weight in `[0, 1]`.
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }

    /// Normalized Shannon entropy over the category labels of `selected`.
    ///
    /// Returns 0.0 when fewer than two distinct categories are present, and
    /// 1.0 at maximum category spread. Items missing from the catalog or
    /// with empty categories are ignored.
    pub fn diversity_score(
        selected: &[ScoredItem],
        catalog: &HashMap<i64, CatalogItem>,
    ) -> f32 {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0usize;
        for s in selected {
            if let Some(item) = catalog.get(&s.id) {
                if !item.category.is_empty() {
                    *counts.entry(item.category.as_str()).or_insert(0) += 1;
                    total += 1;
                }
            }
        }
        if counts.len() < 2 {
            return 0.0;
        }

        let total = total as f64;
        let entropy: f64 = counts
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum();
        let max_entropy = (counts.len() as f64).log2();
        (entropy / max_entropy) as f32
    }
}

impl Reranker for DiversityReranker {
    fn rerank(
        &self,
        candidates: Vec<ScoredItem>,
        catalog: &HashMap<i64, CatalogItem>,
    ) -> Vec<ScoredItem> {
        // Diversity is undefined with too few items.
        if candidates.len() <= 2 {
            return candidates;
        }

        let mut remaining = candidates;
        let mut selected = vec![remaining.remove(0)];

        while !remaining.is_empty() {
            let mut best_idx = 0;
            let mut best_score = f32::NEG_INFINITY;
            // Iterating in rank order with a strict comparison breaks ties
            // in favor of the earlier-ranked candidate.
            for (idx, candidate) in remaining.iter().enumerate() {
                selected.push(*candidate);
                let diversity = Self::diversity_score(&selected, catalog);
                selected.pop();
                let combined =
                    (1.0 - self.weight) * candidate.score + self.weight * diversity;
                if combined > best_score {
                    best_score = combined;
                    best_idx = idx;
                }
            }
            selected.push(remaining.remove(best_idx));
        }

        selected
    }
}
