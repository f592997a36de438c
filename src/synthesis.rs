//! Answer synthesis from ranked passages.
//!
//! Composes an extractive answer: the top-ranked passage leads, a few
//! supporting excerpts follow, and every passage used is cited with its
//! document id and byte offsets. Confidence is a pure function of the
//! ranking, so the same retrieval output always produces the same
//! answer, confidence, and citation list.

use crate::models::{Answer, Citation, RankedResult};

/// Weight of the top score in the confidence blend.
const TOP_WEIGHT: f64 = 0.7;
/// Weight of the top-to-runner-up gap in the confidence blend.
const GAP_WEIGHT: f64 = 0.3;

/// Character cap for supporting excerpts.
const EXCERPT_CHARS: usize = 240;

/// Guidance shown to callers when retrieval produced no evidence.
pub const NO_EVIDENCE_TEXT: &str = "I don't have specific information about that question in my \
    database. Please try rephrasing your question or ask about fundamental rights, constitutional \
    law, or legal procedures.";

/// Synthesis knobs resolved from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisParams {
    /// Upper bound on passages folded into one answer.
    pub max_passages: usize,
}

/// Compose an answer from ranked passages.
///
/// An empty ranking yields the no-evidence answer: empty text, zero
/// confidence, no citations. Otherwise up to `max_passages` hits are
/// used in rank order and cited in the same order.
pub fn synthesize(_query_text: &str, ranked: &RankedResult, params: &SynthesisParams) -> Answer {
    if ranked.is_empty() {
        return Answer {
            text: String::new(),
            confidence: 0.0,
            citations: Vec::new(),
            no_evidence: true,
        };
    }

    let used = &ranked.hits[..ranked.hits.len().min(params.max_passages.max(1))];

    let mut text = used[0].passage.text.trim().to_string();
    if used.len() > 1 {
        text.push_str("\n\nRelated passages:");
        for hit in &used[1..] {
            text.push_str("\n- ");
            text.push_str(&excerpt(&hit.passage.text));
        }
    }

    let citations = used
        .iter()
        .map(|hit| Citation {
            document_id: hit.passage.document_id.clone(),
            passage_id: hit.passage.id.clone(),
            start: hit.passage.start,
            end: hit.passage.end,
        })
        .collect();

    Answer {
        text,
        confidence: confidence(ranked),
        citations,
        no_evidence: false,
    }
}

/// Deterministic confidence in `[0, 1]`.
///
/// A weighted blend of the top score and its gap to the runner-up:
/// stronger top evidence and a clearer margin both raise confidence. A
/// lone hit counts its full score as the gap.
pub fn confidence(ranked: &RankedResult) -> f64 {
    let top = match ranked.hits.first() {
        Some(hit) => hit.score,
        None => return 0.0,
    };
    let second = ranked.hits.get(1).map(|hit| hit.score).unwrap_or(0.0);
    (TOP_WEIGHT * top + GAP_WEIGHT * (top - second)).clamp(0.0, 1.0)
}

/// Presentation text for an answer: the synthesized text, or the
/// guidance sentence when there was no evidence to answer from.
pub fn display_text(answer: &Answer) -> &str {
    if answer.no_evidence {
        NO_EVIDENCE_TEXT
    } else {
        &answer.text
    }
}

/// Single-line excerpt capped at [`EXCERPT_CHARS`] characters.
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}
