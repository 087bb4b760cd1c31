//! Sentence-boundary document chunking with word-level overlap.

use std::collections::HashMap;

use crate::types::{DocumentChunk, SourceType, TermVector};

/// Splits long-form text into bounded, overlapping passages.
///
/// Sentences (split on `.`, `!`, `?`) are accumulated into a buffer joined
/// by `". "`. When appending the next sentence (joiner included) would push
/// the buffer past `max_chars` and the buffer is non-empty, the buffer is
/// emitted and a new one is seeded with the last `overlap_words` words of
/// the emitted chunk. The final non-empty buffer is always emitted, even
/// under the size floor. A single sentence longer than `max_chars` (after
/// the overlap seed) still produces an oversized chunk.
///
/// Chunk ids are `{source_id}_{sequence}`, sequence starting at 0.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_chars: usize,
    overlap_words: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_chars` — maximum chunk size in characters
    /// * `overlap_words` — number of trailing words carried into the next chunk
    pub fn new(max_chars: usize, overlap_words: usize) -> Self {
        Self { max_chars, overlap_words }
    }

    /// Split `text` into chunks carrying the given provenance metadata.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only input. Each
    /// returned chunk has an empty term vector; the retrieval store
    /// attaches vectors at indexing time.
    pub fn chunk(
        &self,
        source_id: &str,
        text: &str,
        source_type: SourceType,
        metadata: &HashMap<String, String>,
    ) -> Vec<DocumentChunk> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut sequence = 0;

        for sentence in sentences {
            // The joiner counts toward the size bound.
            if !buffer.is_empty()
                && buffer.chars().count() + 2 + sentence.chars().count() > self.max_chars
            {
                let overlap = trailing_words(&buffer, self.overlap_words);
                chunks.push(self.make_chunk(source_id, sequence, &buffer, source_type, metadata));
                sequence += 1;
                buffer = format!("{overlap} {sentence}");
            } else if buffer.is_empty() {
                buffer = sentence;
            } else {
                buffer.push_str(". ");
                buffer.push_str(&sentence);
            }
        }

        if !buffer.trim().is_empty() {
            chunks.push(self.make_chunk(source_id, sequence, &buffer, source_type, metadata));
        }

        chunks
    }

    fn make_chunk(
        &self,
        source_id: &str,
        sequence: usize,
        content: &str,
        source_type: SourceType,
        metadata: &HashMap<String, String>,
    ) -> DocumentChunk {
        DocumentChunk {
            id: format!("{source_id}_{sequence}"),
            content: content.trim().to_string(),
            source_type,
            metadata: metadata.clone(),
            vector: TermVector::default(),
        }
    }
}

/// Split on sentence-terminating punctuation, dropping empty fragments.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The last `n` whitespace-separated words of `text` (all of it if shorter).
fn trailing_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= n {
        return text.to_string();
    }
    words[words.len() - n..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, max_chars: usize, overlap_words: usize) -> Vec<DocumentChunk> {
        SentenceChunker::new(max_chars, overlap_words).chunk(
            "doc",
            text,
            SourceType::Policy,
            &HashMap::new(),
        )
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("", 100, 5).is_empty());
        assert!(chunk("   ", 100, 5).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk("Returns are accepted within thirty days.", 200, 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc_0");
        assert_eq!(chunks[0].content, "Returns are accepted within thirty days");
    }

    #[test]
    fn chunk_ids_are_sequential_from_zero() {
        let text = "First sentence here. Second sentence here. Third sentence here. \
                    Fourth sentence here. Fifth sentence here.";
        let chunks = chunk(text, 45, 2);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, format!("doc_{i}"));
        }
    }

    #[test]
    fn overlap_carries_trailing_words_forward() {
        let text = "Shipping takes three days in most regions. \
                    Express delivery arrives the next business day.";
        let chunks = chunk(text, 50, 3);
        assert_eq!(chunks.len(), 2);
        // Last three words of chunk 0 open chunk 1.
        assert!(chunks[1].content.starts_with("in most regions Express"));
    }

    #[test]
    fn every_sentence_appears_in_some_chunk() {
        let text = "Alpha sentence one. Beta sentence two. Gamma sentence three. \
                    Delta sentence four.";
        let chunks = chunk(text, 40, 1);
        for sentence in ["Alpha sentence one", "Beta sentence two", "Gamma sentence three", "Delta sentence four"] {
            assert!(
                chunks.iter().any(|c| c.content.contains(sentence)),
                "missing sentence: {sentence}"
            );
        }
    }

    #[test]
    fn non_final_chunks_respect_the_size_bound() {
        let max_chars = 60;
        let text = "Orders ship within two days. Tracking numbers arrive by email. \
                    Couriers deliver on weekdays only. Signatures are required for refunds. \
                    Lost parcels are replaced free.";
        let chunks = chunk(text, max_chars, 2);
        assert!(chunks.len() > 1);
        for c in &chunks[..chunks.len() - 1] {
            assert!(
                c.content.chars().count() <= max_chars,
                "oversized chunk: {:?}",
                c.content
            );
        }
    }

    #[test]
    fn final_undersized_buffer_is_emitted() {
        let text = "A fairly long opening sentence that fills a chunk. Short tail.";
        let chunks = chunk(text, 50, 2);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].content.ends_with("Short tail"));
    }
}
