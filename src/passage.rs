//! Passage splitting and term signatures.
//!
//! Documents are split into passages on paragraph boundaries (`\n\n`)
//! while respecting a configurable `max_tokens` limit (approximated as
//! 4 characters per token). Each passage records its byte offset range,
//! so `document.text[start..end]` always reproduces the passage text.
//!
//! The same [`TermSignature`] construction serves both sides of
//! retrieval: passages are signed once at corpus load, queries are
//! signed per request, and relevance is the cosine between the two.

use std::collections::HashMap;

use crate::models::Passage;

/// Approximate characters-per-token ratio used to size passages.
const CHARS_PER_TOKEN: usize = 4;

/// Tokens shorter than this carry no retrieval signal and are dropped.
const MIN_TOKEN_LEN: usize = 3;

/// Sparse term-frequency vector over lowercased alphanumeric tokens.
#[derive(Debug, Clone, Default)]
pub struct TermSignature {
    terms: HashMap<String, f64>,
    magnitude: f64,
}

impl TermSignature {
    /// Build a signature from raw text. Whitespace, punctuation, and
    /// casing never affect the result; text with no usable tokens yields
    /// an empty signature.
    pub fn build(text: &str) -> Self {
        let mut terms: HashMap<String, f64> = HashMap::new();
        for token in tokenize(text) {
            *terms.entry(token).or_insert(0.0) += 1.0;
        }
        let magnitude = terms.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { terms, magnitude }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Cosine similarity in `[0, 1]`. An empty signature scores zero
    /// against everything, including itself.
    pub fn cosine(&self, other: &TermSignature) -> f64 {
        if self.magnitude < f64::EPSILON || other.magnitude < f64::EPSILON {
            return 0.0;
        }
        let (small, large) = if self.terms.len() <= other.terms.len() {
            (&self.terms, &other.terms)
        } else {
            (&other.terms, &self.terms)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(term, weight)| large.get(term).map(|w| weight * w))
            .sum();
        dot / (self.magnitude * other.magnitude)
    }
}

/// Lowercased alphanumeric tokens of at least [`MIN_TOKEN_LEN`] characters.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .map(|token| token.to_lowercase())
}

/// Split document text into passages on paragraph boundaries, keeping
/// each passage under `max_tokens`. Oversized paragraphs are hard-split
/// at whitespace. Blank text yields no passages.
pub fn split_passages(document_id: &str, text: &str, max_tokens: usize) -> Vec<Passage> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;
    let mut spans: Vec<(usize, usize)> = Vec::new();

    // Open run of merged paragraphs, as a byte range into `text`.
    let mut run: Option<(usize, usize)> = None;
    for (start, para) in paragraphs(text) {
        let end = start + para.len();
        run = match run {
            None if para.len() > max_chars => {
                spans.extend(hard_split(text, start, end, max_chars));
                None
            }
            None => Some((start, end)),
            Some((run_start, _)) if end - run_start <= max_chars => Some((run_start, end)),
            Some(span) => {
                spans.push(span);
                if para.len() > max_chars {
                    spans.extend(hard_split(text, start, end, max_chars));
                    None
                } else {
                    Some((start, end))
                }
            }
        };
    }
    if let Some(span) = run {
        spans.push(span);
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(seq, (start, end))| make_passage(document_id, seq, start, end, &text[start..end]))
        .collect()
}

/// Non-blank paragraphs with the byte offset of their trimmed start.
fn paragraphs(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for raw in text.split("\n\n") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let lead = raw.len() - raw.trim_start().len();
            out.push((offset + lead, trimmed));
        }
        offset += raw.len() + 2;
    }
    out
}

/// Split an oversized paragraph into pieces of at most `max_chars`,
/// preferring newline and space boundaries, then char boundaries.
fn hard_split(text: &str, start: usize, end: usize, max_chars: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let mut cut = (cursor + max_chars).min(end);
        while cut < end && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut < end {
            let window = &text[cursor..cut];
            if let Some(pos) = window.rfind('\n').or_else(|| window.rfind(' ')) {
                if pos > 0 {
                    cut = cursor + pos + 1;
                }
            }
        }
        let (s, e) = trim_span(text, cursor, cut);
        if s < e {
            spans.push((s, e));
        }
        cursor = cut;
    }
    spans
}

/// Shrink a span so it starts and ends on non-whitespace.
fn trim_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let tail = slice.len() - slice.trim_end().len();
    (start + lead, end - tail)
}

fn make_passage(document_id: &str, seq: usize, start: usize, end: usize, text: &str) -> Passage {
    Passage {
        id: format!("{}#{:04}", document_id, seq),
        document_id: document_id.to_string(),
        seq,
        start,
        end,
        text: text.to_string(),
        signature: TermSignature::build(text),
    }
}
