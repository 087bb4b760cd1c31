//! Text normalization seam.
//!
//! The indexing pipeline treats normalization as a pure function supplied by
//! a collaborator: raw text in, canonical token stream out. The trait keeps
//! that seam explicit; [`SimpleNormalizer`] is a self-contained reference
//! implementation (lowercase, punctuation and digit stripping, stopword
//! filtering, light suffix stemming).

use std::collections::HashMap;

/// A pure text normalizer producing canonical token streams and keywords.
pub trait TextNormalizer: Send + Sync {
    /// Normalize raw text into a canonical token stream joined by single
    /// spaces. Returns an empty string when nothing survives normalization.
    fn normalize(&self, text: &str) -> String;

    /// Extract up to `max` keywords from raw text, most frequent first
    /// (ties broken lexicographically).
    fn keywords(&self, text: &str, max: usize) -> Vec<String>;
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "our", "that", "the", "their", "this", "to", "was",
    "were", "will", "with", "you", "your",
];

// Longest-first so "ing" is tried before "s".
const SUFFIXES: &[&str] = &["ing", "ed", "es", "ly", "s"];

/// A dependency-free normalizer suitable for catalog text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleNormalizer;

impl SimpleNormalizer {
    /// Create a new `SimpleNormalizer`.
    pub fn new() -> Self {
        Self
    }

    fn clean(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_alphabetic() {
                out.extend(c.to_lowercase());
            } else {
                // Punctuation and digits become token boundaries.
                out.push(' ');
            }
        }
        out
    }

    fn stem(token: &str) -> String {
        for suffix in SUFFIXES {
            if let Some(stem) = token.strip_suffix(suffix) {
                if stem.chars().count() >= 3 {
                    return stem.to_string();
                }
            }
        }
        token.to_string()
    }
}

impl TextNormalizer for SimpleNormalizer {
    fn normalize(&self, text: &str) -> String {
        let cleaned = Self::clean(text);
        let tokens: Vec<String> = cleaned
            .split_whitespace()
            .filter(|t| !STOPWORDS.contains(t))
            .map(Self::stem)
            .collect();
        tokens.join(" ")
    }

    fn keywords(&self, text: &str, max: usize) -> Vec<String> {
        let normalized = self.normalize(text);
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for token in normalized.split_whitespace() {
            if token.chars().count() > 2 {
                *freq.entry(token).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(max).map(|(t, _)| t.to_string()).collect()
    }
}
