//! Structured analysis of legal documents.
//!
//! Produces a summary, detected clause families, flagged risk phrases,
//! numbered section headings, and case/statute citations for a corpus
//! document or for ad hoc text. The summary reuses retrieval scoring:
//! passages are ranked against the whole document's term signature and
//! the most central one leads.
//!
//! Clause and risk detection are keyword probes over cleaned lowercase
//! text. Sections and citations are extracted from the raw text, since
//! both depend on line structure and casing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::corpus::{make_document, CorpusStore};
use crate::error::QueryError;
use crate::models::{DocumentAnalysis, DocumentMeta, Passage, Section};
use crate::passage::TermSignature;

/// Clause families probed by keyword, in report order.
const CLAUSE_TYPES: &[(&str, &[&str])] = &[
    ("indemnification", &["indemnify", "indemnification", "hold harmless"]),
    ("termination", &["terminate", "termination", "expiration"]),
    ("confidentiality", &["confidential", "confidentiality", "non-disclosure"]),
    ("governing law", &["governing law", "governed by the laws", "venue"]),
    ("limitation of liability", &["limitation of liability", "consequential damages", "liability is limited"]),
    ("arbitration", &["arbitration", "arbitrator"]),
    ("assignment", &["assignment", "may not assign", "successors and assigns"]),
    ("force majeure", &["force majeure", "beyond the reasonable control"]),
    ("payment terms", &["payment", "invoice", "late fee"]),
    ("warranty", &["warranty", "warrants", "merchantability"]),
];

/// Risk phrases flagged verbatim, in report order.
const RISK_TERMS: &[&str] = &[
    "sole discretion",
    "unlimited liability",
    "non-refundable",
    "liquidated damages",
    "irrevocable",
    "waive",
    "penalty",
    "automatic renewal",
    "exclusive remedy",
    "hold harmless",
    "without notice",
];

/// Numbered headings: `Section 4.2 Title` or bare `4.2 Title`. Component
/// digits are capped so years in prose do not read as section numbers.
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:Section\s+)?(\d{1,3}(?:\.\d{1,3})*)\.?\s+([A-Z][^\n]{0,119})").unwrap()
});

/// Scanned-page artifacts removed before keyword probing.
static PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPage\s+\d+\s+of\s+\d+\b").unwrap());

/// Party-versus-party case names, e.g. `Marbury v. Madison`.
static CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-Z][A-Za-z.']*(?:\s+[A-Z][A-Za-z.']*){0,4}\s+v\.\s+[A-Z][A-Za-z.']*(?:\s+[A-Z][A-Za-z.']*){0,4}",
    )
    .unwrap()
});

/// United States Code references, e.g. `42 U.S.C. § 1983`.
static USC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s+U\.S\.C\.\s*§{0,2}\s*\d+[a-z]*(?:\([a-z0-9]+\))*").unwrap()
});

/// Analyze a document already in the corpus.
pub fn analyze_document(
    corpus: &CorpusStore,
    document_id: &str,
) -> Result<DocumentAnalysis, QueryError> {
    let doc = corpus
        .get(document_id)
        .ok_or_else(|| QueryError::NotFound(format!("document: {}", document_id)))?;
    let passages = corpus.passages_for(document_id).unwrap_or(&[]);
    Ok(analyze(&doc.text, passages))
}

/// Analyze ad hoc text by treating it as a single-document corpus.
pub fn analyze_text(text: &str, max_tokens: usize) -> DocumentAnalysis {
    let doc = make_document("adhoc", "Ad hoc document", text, DocumentMeta::default());
    let corpus = CorpusStore::from_documents(vec![doc], max_tokens);
    let passages = corpus.passages_for("adhoc").unwrap_or(&[]);
    analyze(text, passages)
}

fn analyze(text: &str, passages: &[Passage]) -> DocumentAnalysis {
    let cleaned = clean_text(text);
    let lower = cleaned.to_lowercase();

    let clause_types = CLAUSE_TYPES
        .iter()
        .filter(|(_, probes)| probes.iter().any(|probe| lower.contains(probe)))
        .map(|(name, _)| name.to_string())
        .collect();

    let risk_terms = RISK_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| term.to_string())
        .collect();

    DocumentAnalysis {
        summary: summarize(&cleaned, passages),
        clause_types,
        risk_terms,
        sections: extract_sections(text),
        case_citations: extract_case_citations(text),
    }
}

/// Collapse whitespace runs and strip page artifacts.
pub fn clean_text(text: &str) -> String {
    let no_pages = PAGE_RE.replace_all(text, " ");
    no_pages.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lead of the passage most representative of the whole document:
/// highest cosine against the full-document signature, earliest passage
/// on a tie.
fn summarize(cleaned: &str, passages: &[Passage]) -> String {
    let doc_sig = TermSignature::build(cleaned);
    let central = passages.iter().max_by(|a, b| {
        doc_sig
            .cosine(&a.signature)
            .partial_cmp(&doc_sig.cosine(&b.signature))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.id.cmp(&a.id))
    });
    match central {
        Some(passage) => lead_sentences(&passage.text, 2, 400),
        None => lead_sentences(cleaned, 2, 400),
    }
}

/// Up to `max_sentences` leading sentences, capped at `max_chars`.
fn lead_sentences(text: &str, max_sentences: usize, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::new();
    let mut count = 0;
    for piece in flat.split_inclusive(|c| matches!(c, '.' | '?' | '!')) {
        out.push_str(piece);
        count += 1;
        if count >= max_sentences || out.chars().count() >= max_chars {
            break;
        }
    }
    let out = out.trim();
    if out.chars().count() > max_chars {
        out.chars().take(max_chars).collect()
    } else {
        out.to_string()
    }
}

fn extract_sections(text: &str) -> Vec<Section> {
    SECTION_RE
        .captures_iter(text)
        .map(|cap| Section {
            number: cap[1].to_string(),
            title: cap[2].trim().trim_end_matches(['.', ':']).to_string(),
        })
        .collect()
}

/// Case and statute citations in first-occurrence order, deduplicated.
fn extract_case_citations(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for re in [&*CASE_RE, &*USC_RE] {
        for found in re.find_iter(text) {
            let cite = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            if seen.insert(cite.clone()) {
                out.push(cite);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::make_document;

    #[test]
    fn test_clause_detection() {
        let text = "Either party may terminate this Agreement upon notice. The vendor shall \
                    indemnify and hold harmless the customer from third-party claims.";
        let analysis = analyze_text(text, 100);
        assert!(analysis.clause_types.contains(&"indemnification".to_string()));
        assert!(analysis.clause_types.contains(&"termination".to_string()));
        assert!(!analysis.clause_types.contains(&"arbitration".to_string()));
    }

    #[test]
    fn test_risk_terms_in_table_order() {
        let text = "Fees are non-refundable. The licensor may modify pricing at its sole \
                    discretion without notice.";
        let analysis = analyze_text(text, 100);
        assert_eq!(
            analysis.risk_terms,
            vec!["sole discretion", "non-refundable", "without notice"]
        );
    }

    #[test]
    fn test_section_extraction() {
        let text = "Section 1. Definitions\n1.1 Scope of Work\nIn 2024 the parties executed this \
                    agreement.\nSection 2 Payment Terms\n";
        let sections = extract_sections(text);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], Section { number: "1".into(), title: "Definitions".into() });
        assert_eq!(sections[1], Section { number: "1.1".into(), title: "Scope of Work".into() });
        assert_eq!(sections[2], Section { number: "2".into(), title: "Payment Terms".into() });
    }

    #[test]
    fn test_case_citations_deduplicated() {
        let text = "The court decided Marbury v. Madison in 1803. Claims arise under \
                    42 U.S.C. § 1983. Courts still cite Marbury v. Madison for judicial review.";
        let cites = extract_case_citations(text);
        assert_eq!(cites, vec!["Marbury v. Madison", "42 U.S.C. § 1983"]);
    }

    #[test]
    fn test_clean_text_strips_page_artifacts() {
        let text = "The parties agree as follows.\nPage 3 of 10\nNotices must be in writing.";
        let cleaned = clean_text(text);
        assert!(!cleaned.contains("Page 3"));
        assert!(cleaned.contains("The parties agree as follows. Notices must be in writing."));
    }

    #[test]
    fn test_summary_prefers_central_passage() {
        let text = "Indemnification obligations survive termination of this agreement.\n\n\
                    The indemnification and termination provisions of this agreement control all obligations.\n\n\
                    Notices must be sent by registered mail.";
        let analysis = analyze_text(text, 25);
        assert!(analysis.summary.starts_with("The indemnification and termination"));
    }

    #[test]
    fn test_analyze_document_not_found() {
        let corpus = CorpusStore::from_documents(
            vec![make_document("a", "A", "Some text here.", DocumentMeta::default())],
            100,
        );
        let err = analyze_document(&corpus, "missing").unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
        assert!(analyze_document(&corpus, "a").is_ok());
    }

    #[test]
    fn test_analyze_text_full_report() {
        let text = "Section 1. Arbitration\nAll disputes are resolved by binding arbitration.\n\n\
                    Section 2. Liability\nLiability is limited; the customer waives claims for \
                    liquidated damages beyond the fee paid. See 15 U.S.C. § 1681.";
        let analysis = analyze_text(text, 100);
        assert!(!analysis.summary.is_empty());
        assert!(analysis.clause_types.contains(&"arbitration".to_string()));
        assert!(analysis.risk_terms.contains(&"liquidated damages".to_string()));
        assert_eq!(analysis.sections.len(), 2);
        assert_eq!(analysis.case_citations, vec!["15 U.S.C. § 1681"]);
    }
}
