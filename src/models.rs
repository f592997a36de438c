//! Core data models used throughout Legal Mind.
//!
//! These types describe the corpus (documents and their passages), the
//! retrieval output, and the synthesized answers that flow out through
//! the protocol surfaces.

use serde::{Deserialize, Serialize};

use crate::passage::TermSignature;

/// A legal document as loaded into the corpus.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identifier, unique within the corpus.
    pub id: String,
    pub title: String,
    /// Full raw text. Passage offsets index into this string.
    pub text: String,
    pub meta: DocumentMeta,
    /// Content hash used to skip duplicate documents at load time.
    pub content_hash: String,
}

/// Optional descriptive fields carried alongside a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub jurisdiction: Option<String>,
    pub doc_type: Option<String>,
    pub date: Option<String>,
}

/// A contiguous span of a document, the unit of retrieval.
#[derive(Debug, Clone)]
pub struct Passage {
    /// `"{document_id}#{seq:04}"`; lexicographic order within a document
    /// matches positional order.
    pub id: String,
    pub document_id: String,
    /// Zero-based position within the document.
    pub seq: usize,
    /// Byte offset range into [`Document::text`]; `text` equals that slice.
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Term signature built once at load time and reused for every query.
    pub signature: TermSignature,
}

/// One passage with its relevance score for a particular query.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    /// Cosine relevance in `(0, 1]`; passages with no term overlap are
    /// dropped before ranking.
    pub score: f64,
}

/// Ordered retrieval output: descending score, ties broken by ascending
/// passage id, truncated to the requested size.
#[derive(Debug, Clone, Default)]
pub struct RankedResult {
    pub hits: Vec<ScoredPassage>,
}

impl RankedResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// A pointer from an answer back into the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub document_id: String,
    pub passage_id: String,
    /// Byte offset range of the cited passage within its document.
    pub start: usize,
    pub end: usize,
}

/// A synthesized answer with its evidence trail.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Composed answer text; empty when `no_evidence` is set.
    pub text: String,
    /// Deterministic confidence in `[0, 1]`.
    pub confidence: f64,
    /// One citation per passage used, in the order they were used.
    pub citations: Vec<Citation>,
    /// Set when retrieval produced nothing to ground an answer on.
    pub no_evidence: bool,
}

/// Structured output of document analysis.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    /// Clause families detected by keyword probes, in table order.
    pub clause_types: Vec<String>,
    /// Risk phrases found verbatim in the text, in table order.
    pub risk_terms: Vec<String>,
    pub sections: Vec<Section>,
    /// Case and statute citations in first-occurrence order, deduplicated.
    pub case_citations: Vec<String>,
}

/// A numbered section heading detected in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Dotted section number as written, e.g. `"4"` or `"4.2"`.
    pub number: String,
    pub title: String,
}
