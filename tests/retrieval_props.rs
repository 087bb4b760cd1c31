//! Property tests for retrieval ordering and cache key derivation.

use std::collections::{BTreeMap, HashMap};

use proptest::prelude::*;
use shoplens::{
    cache_key, DocumentChunk, RetrievalStore, SimpleNormalizer, SourceType, TermVector,
    TfidfVectorizer, VectorizerConfig,
};

/// Generate a document text of random lowercase words.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{3,10}", 3..12).prop_map(|words| words.join(" "))
}

fn chunk(index: usize, content: String) -> DocumentChunk {
    DocumentChunk {
        id: format!("doc_{index}"),
        content,
        source_type: SourceType::Faq,
        metadata: HashMap::new(),
        vector: TermVector::default(),
    }
}

mod prop_retrieval_search_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any indexed corpus, search results come back ordered by
        /// descending score, bounded by `top_k`, all at or above the floor.
        #[test]
        fn results_ordered_bounded_and_floored(
            texts in proptest::collection::vec(arb_text(), 2..15),
            query in arb_text(),
            top_k in 1usize..20,
        ) {
            let normalizer = SimpleNormalizer::new();
            let mut store = RetrievalStore::new(VectorizerConfig::default());
            let chunks: Vec<DocumentChunk> =
                texts.into_iter().enumerate().map(|(i, t)| chunk(i, t)).collect();
            // Random corpora can be entirely filtered out by the
            // document-frequency bounds; skip those cases.
            prop_assume!(store.add_documents(chunks, &normalizer).is_ok());

            let min_score = 0.1f32;
            let results = store.search(&query, top_k, min_score, &normalizer);

            prop_assert!(results.len() <= top_k);
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for result in &results {
                prop_assert!(result.score >= min_score);
                prop_assert!(result.score <= 1.0);
                prop_assert!(!result.explanation.is_empty());
            }
        }

        /// Every vector produced by one fitted vectorizer scores exactly 1
        /// against itself (unless zero) and within `[0, 1]` against others.
        #[test]
        fn similarity_is_bounded_and_reflexive(
            texts in proptest::collection::vec(arb_text(), 2..10),
        ) {
            let mut vectorizer = TfidfVectorizer::new(VectorizerConfig::default());
            prop_assume!(vectorizer.fit(&texts).is_ok());
            let vectors = vectorizer.transform(&texts).unwrap();

            for a in &vectors {
                if !a.is_zero() {
                    prop_assert_eq!(TfidfVectorizer::similarity(a, a), 1.0);
                }
                for b in &vectors {
                    let s = TfidfVectorizer::similarity(a, b);
                    prop_assert!((0.0..=1.0).contains(&s));
                }
            }
        }
    }
}

mod prop_cache_key_derivation {
    use super::*;

    fn arb_params() -> impl Strategy<Value = BTreeMap<String, String>> {
        proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,12}", 0..5)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The same operation, parameters, and version always derive the
        /// same key, and the key is prefixed with the operation name.
        #[test]
        fn key_is_deterministic(
            op in "[a-z_]{1,12}",
            params in arb_params(),
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let a = cache_key(&op, &params, &version);
            let b = cache_key(&op, &params, &version);
            prop_assert_eq!(&a, &b);
            let expected_prefix = format!("{op}_");
            prop_assert!(a.starts_with(&expected_prefix));
        }

        /// Changing the index version always changes the key, which is what
        /// makes stale entries unreachable after a rebuild.
        #[test]
        fn key_depends_on_index_version(
            op in "[a-z_]{1,12}",
            params in arb_params(),
            version in "[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let v1 = format!("{version}.1");
            let v2 = format!("{version}.2");
            prop_assert_ne!(cache_key(&op, &params, &v1), cache_key(&op, &params, &v2));
        }
    }
}
