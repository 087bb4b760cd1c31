//! Templated answer synthesis over retrieved passages.

use sha2::{Digest, Sha256};

use crate::types::{AskSource, RetrievalResult, SourceType};

const COULD_NOT_UNDERSTAND: &str =
    "I could not understand your question. Could you rephrase it?";
const NO_RELEVANT_INFORMATION: &str =
    "I could not find relevant information to answer your question. \
     Try rephrasing it or asking something different.";

const FAQ_LABEL: &str = "From our FAQ:";
const POLICY_LABEL: &str = "According to our policies:";
const ITEM_LABEL: &str = "About our products:";

/// Maximum excerpt length for source citations, in characters.
const EXCERPT_CHARS: usize = 200;

/// A synthesized answer with sources and a confidence score.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The assembled answer text.
    pub text: String,
    /// Cited sources, best first.
    pub sources: Vec<AskSource>,
    /// Mean retrieval score of the cited sources.
    pub confidence: f32,
    /// Stable trace id; `None` for the fixed fallback responses.
    pub trace_id: Option<String>,
}

/// Assembles templated answers from retrieval results.
///
/// Results are grouped by source type in fixed priority order (FAQ, then
/// policy, then item), each group prefixed with its label. The answer is
/// hard-truncated to `max_chars` with an ellipsis marker.
#[derive(Debug, Clone, Copy)]
pub struct AnswerSynthesizer {
    max_chars: usize,
}

impl AnswerSynthesizer {
    /// Create a synthesizer with the given answer length cap.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// The fixed response for a blank question. Never consults retrieval.
    pub fn could_not_understand(&self) -> Answer {
        Answer {
            text: COULD_NOT_UNDERSTAND.to_string(),
            sources: Vec::new(),
            confidence: 0.0,
            trace_id: None,
        }
    }

    /// Synthesize an answer for `question` from `results`.
    ///
    /// A blank question or an empty result set yields the corresponding
    /// fixed response with confidence 0 and no sources.
    pub fn answer(&self, question: &str, results: &[RetrievalResult]) -> Answer {
        if question.trim().is_empty() {
            return self.could_not_understand();
        }
        if results.is_empty() {
            return Answer {
                text: NO_RELEVANT_INFORMATION.to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                trace_id: None,
            };
        }

        let confidence =
            results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32;

        let mut sections: Vec<String> = Vec::new();
        for (source_type, label) in [
            (SourceType::Faq, FAQ_LABEL),
            (SourceType::Policy, POLICY_LABEL),
            (SourceType::Item, ITEM_LABEL),
        ] {
            let lines: Vec<String> = results
                .iter()
                .filter(|r| r.chunk.source_type == source_type)
                .map(|r| match source_type {
                    SourceType::Item => {
                        let name =
                            r.chunk.metadata.get("name").map_or("Product", String::as_str);
                        format!("- {name}: {}", r.chunk.content)
                    }
                    _ => format!("- {}", r.chunk.content),
                })
                .collect();
            if !lines.is_empty() {
                sections.push(format!("{label}\n{}", lines.join("\n")));
            }
        }

        let mut text = if sections.is_empty() {
            // Should not occur with non-empty results; fall back to the best chunk.
            format!("Here is what I found: {}", results[0].chunk.content)
        } else {
            sections.join("\n\n")
        };
        text = truncate_chars(&text, self.max_chars);

        let sources = results
            .iter()
            .map(|r| AskSource {
                chunk_id: r.chunk.id.clone(),
                excerpt: truncate_chars(&r.chunk.content, EXCERPT_CHARS),
                score: r.score,
                explanation: r.explanation.clone(),
                metadata: r.chunk.metadata.clone(),
            })
            .collect();

        Answer { text, sources, confidence, trace_id: Some(trace_id(question, results.len())) }
    }
}

/// Stable trace id for correlating an answer with the audit log.
fn trace_id(question: &str, result_count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("ask_{}_{result_count}", &hash[..12])
}

/// Truncate to at most `max` characters, appending `...` when cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
