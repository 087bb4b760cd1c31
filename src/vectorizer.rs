//! Term-weight (TF-IDF) vectorization over normalized text.
//!
//! [`TfidfVectorizer::fit`] builds a [`Vocabulary`] of unigrams and bigrams
//! with per-term document frequencies; [`TfidfVectorizer::transform`] turns
//! texts into sparse [`TermVector`]s against that vocabulary. Re-fitting
//! replaces the vocabulary wholesale; there is no incremental merge.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::VectorizerConfig;
use crate::error::{Error, Result};
use crate::types::TermVector;

/// An ordered term set with per-term document frequencies.
///
/// Immutable after fit. Terms are stored in lexicographic order, so every
/// vector produced against one vocabulary shares the same term indexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    doc_freq: Vec<u32>,
    doc_count: u32,
}

impl Vocabulary {
    fn new(terms: Vec<String>, doc_freq: Vec<u32>, doc_count: u32) -> Self {
        Self { terms, doc_freq, doc_count }
    }

    /// Number of terms (the dimensionality of produced vectors).
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The term at a vocabulary index, if in range.
    pub fn term(&self, idx: u32) -> Option<&str> {
        self.terms.get(idx as usize).map(String::as_str)
    }

    fn index_of(&self, term: &str) -> Option<u32> {
        // Terms are stored in lexicographic order.
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok().map(|i| i as u32)
    }

    /// Smoothed log-scaled inverse document frequency for a term index.
    fn idf(&self, idx: u32) -> f32 {
        let df = self.doc_freq.get(idx as usize).copied().unwrap_or(0);
        let n = f64::from(self.doc_count);
        (((1.0 + n) / (1.0 + f64::from(df))).ln() + 1.0) as f32
    }
}

/// Unigrams plus adjacent-pair bigrams of a normalized token stream.
fn terms_of(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut terms: Vec<String> = tokens.iter().map(|t| (*t).to_string()).collect();
    for pair in tokens.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}

/// TF-IDF vectorizer with a capped unigram/bigram vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocab: Option<Vocabulary>,
}

impl TfidfVectorizer {
    /// Create an unfitted vectorizer with the given configuration.
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config, vocab: None }
    }

    /// True once [`fit`](Self::fit) has succeeded.
    pub fn is_fitted(&self) -> bool {
        self.vocab.is_some()
    }

    /// The fitted vocabulary, if any.
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocab.as_ref()
    }

    /// Fit a vocabulary over a corpus of normalized texts.
    ///
    /// Terms must appear in at least `min_df` documents and in fewer than
    /// `max_df_fraction` of all documents. When more terms qualify than
    /// `max_features`, the highest-document-frequency terms are kept, with
    /// lexicographic tie-break on the term string. Any previous vocabulary
    /// is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the corpus is empty or no term survives
    /// the frequency filters.
    pub fn fit(&mut self, corpus: &[String]) -> Result<()> {
        if corpus.is_empty() {
            return Err(Error::Build("corpus is empty".to_string()));
        }

        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        for text in corpus {
            let unique: HashSet<String> = terms_of(text).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f32;
        let max_df = self.config.max_df_fraction * n;
        let mut qualified: Vec<(String, u32)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df as usize >= self.config.min_df && (*df as f32) < max_df)
            .collect();

        if qualified.is_empty() {
            return Err(Error::Build(
                "no vocabulary terms survived document-frequency filtering".to_string(),
            ));
        }

        if qualified.len() > self.config.max_features {
            qualified.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            qualified.truncate(self.config.max_features);
        }

        // Final term ordering is lexicographic, independent of the cap pass.
        qualified.sort_by(|a, b| a.0.cmp(&b.0));
        let (terms, freqs): (Vec<String>, Vec<u32>) = qualified.into_iter().unzip();
        self.vocab = Some(Vocabulary::new(terms, freqs, corpus.len() as u32));
        Ok(())
    }

    /// Transform normalized texts into term vectors against the fitted
    /// vocabulary. Terms outside the vocabulary carry zero weight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before any successful [`fit`](Self::fit).
    pub fn transform(&self, texts: &[String]) -> Result<Vec<TermVector>> {
        let vocab = self.vocab.as_ref().ok_or(Error::NotFitted)?;
        Ok(texts.iter().map(|t| Self::vectorize(vocab, t)).collect())
    }

    /// Transform a single normalized text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before any successful [`fit`](Self::fit).
    pub fn transform_one(&self, text: &str) -> Result<TermVector> {
        let vocab = self.vocab.as_ref().ok_or(Error::NotFitted)?;
        Ok(Self::vectorize(vocab, text))
    }

    fn vectorize(vocab: &Vocabulary, text: &str) -> TermVector {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for term in terms_of(text) {
            if let Some(idx) = vocab.index_of(&term) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        let entries = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf as f32 * vocab.idf(idx)))
            .collect();
        TermVector::from_entries(entries)
    }

    /// Cosine similarity between two term vectors, in `[0, 1]`.
    /// Defined as 0.0 when either vector is all-zero.
    pub fn similarity(a: &TermVector, b: &TermVector) -> f32 {
        let (norm_a, norm_b) = (a.norm(), b.norm());
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (a.dot(b) / (norm_a * norm_b)).clamp(0.0, 1.0) as f32
    }

    /// The highest-weighted vocabulary terms of a vector, best first.
    pub fn top_terms(&self, vector: &TermVector, k: usize) -> Vec<(String, f32)> {
        let Some(vocab) = self.vocab.as_ref() else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f32)> = vector
            .entries()
            .iter()
            .filter_map(|(idx, w)| vocab.term(*idx).map(|t| (t.to_string(), *w)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(corpus: &[&str]) -> TfidfVectorizer {
        let mut v = TfidfVectorizer::new(VectorizerConfig::default());
        let corpus: Vec<String> = corpus.iter().map(|s| (*s).to_string()).collect();
        v.fit(&corpus).unwrap();
        v
    }

    #[test]
    fn transform_before_fit_is_not_fitted() {
        let v = TfidfVectorizer::new(VectorizerConfig::default());
        assert!(matches!(v.transform_one("laptop"), Err(Error::NotFitted)));
    }

    #[test]
    fn fit_on_empty_corpus_is_a_build_error() {
        let mut v = TfidfVectorizer::new(VectorizerConfig::default());
        assert!(matches!(v.fit(&[]), Err(Error::Build(_))));
    }

    #[test]
    fn self_similarity_is_one_for_non_zero_vectors() {
        let v = fitted(&["gaming laptop fast", "phone android camera", "laptop work office"]);
        let vec = v.transform_one("gaming laptop").unwrap();
        assert!(!vec.is_zero());
        assert_eq!(TfidfVectorizer::similarity(&vec, &vec), 1.0);
    }

    #[test]
    fn similarity_with_zero_vector_is_zero() {
        let v = fitted(&["gaming laptop", "phone android"]);
        let vec = v.transform_one("gaming laptop").unwrap();
        let zero = v.transform_one("zzz unseen").unwrap();
        assert!(zero.is_zero());
        assert_eq!(TfidfVectorizer::similarity(&vec, &zero), 0.0);
    }

    #[test]
    fn bigrams_are_part_of_the_vocabulary() {
        let v = fitted(&["gaming laptop fast", "gaming laptop cheap", "phone android"]);
        let vocab = v.vocabulary().unwrap();
        assert!((0..vocab.len() as u32).any(|i| vocab.term(i) == Some("gaming laptop")));
    }

    #[test]
    fn near_universal_terms_are_dropped() {
        // "common" appears in all 5 documents: 5 >= 0.8 * 5.
        let v = fitted(&[
            "common alpha",
            "common beta",
            "common gamma",
            "common delta",
            "common epsilon",
        ]);
        let vocab = v.vocabulary().unwrap();
        assert!((0..vocab.len() as u32).all(|i| vocab.term(i) != Some("common")));
    }

    #[test]
    fn vocabulary_cap_keeps_highest_df_terms_with_lexicographic_ties() {
        let mut v = TfidfVectorizer::new(VectorizerConfig {
            max_features: 2,
            min_df: 1,
            max_df_fraction: 0.99,
        });
        // df: shared=2; every other unigram and bigram has df=1.
        let corpus = vec![
            "shared apple".to_string(),
            "shared pear".to_string(),
            "other kiwi".to_string(),
        ];
        v.fit(&corpus).unwrap();
        let vocab = v.vocabulary().unwrap();
        assert_eq!(vocab.len(), 2);
        let terms: Vec<&str> = (0..2).filter_map(|i| vocab.term(i)).collect();
        assert!(terms.contains(&"shared"));
        // Among the df=1 ties, "apple" wins lexicographically.
        assert!(terms.contains(&"apple"));
    }

    #[test]
    fn refit_replaces_the_vocabulary_wholesale() {
        let mut v = fitted(&["alpha beta", "alpha gamma"]);
        v.fit(&["delta epsilon".to_string(), "delta zeta".to_string()]).unwrap();
        let vocab = v.vocabulary().unwrap();
        assert!((0..vocab.len() as u32).all(|i| vocab.term(i) != Some("alpha")));
    }

    #[test]
    fn vectors_share_dimensionality_and_ordering() {
        let v = fitted(&["alpha beta gamma", "beta gamma delta", "gamma delta alpha"]);
        let a = v.transform_one("alpha gamma").unwrap();
        let b = v.transform_one("gamma alpha").unwrap();
        // Same bag of terms, different order: neither bigram is in the
        // vocabulary, so both vectors hold exactly the shared unigrams.
        let idx_a: Vec<u32> = a.entries().iter().map(|(i, _)| *i).collect();
        let idx_b: Vec<u32> = b.entries().iter().map(|(i, _)| *i).collect();
        assert_eq!(idx_a, idx_b);
    }
}
