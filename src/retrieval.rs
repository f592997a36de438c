//! Deterministic passage retrieval.
//!
//! A query is signed with the same [`TermSignature`] construction used
//! when the corpus was loaded, every in-scope passage is scored by
//! cosine, and the result is sorted by descending score with an
//! ascending passage-id tie-break before truncation. Identical corpus
//! plus identical query always yields an identical ranking.

use crate::corpus::CorpusStore;
use crate::error::QueryError;
use crate::models::{Passage, RankedResult, ScoredPassage};
use crate::passage::TermSignature;

/// Retrieval knobs resolved from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    /// Result size when the caller does not ask for one.
    pub default_top_k: usize,
    /// Ceiling applied to caller-requested sizes.
    pub max_top_k: usize,
}

impl RetrievalParams {
    /// Caller-requested size clamped to the configured ceiling;
    /// non-positive values pass through so [`search`] can reject them.
    /// Every surface that accepts a top-k goes through this.
    pub fn effective_top_k(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(k) => k.min(self.max_top_k as i64),
            None => self.default_top_k as i64,
        }
    }
}

/// Rank corpus passages against `query_text`.
///
/// `scope` restricts the search to one document id; an unknown id is a
/// [`QueryError::NotFound`]. `top_k` must be at least 1. A query with no
/// usable tokens, or a corpus with no overlapping passage, produces an
/// empty result rather than an error.
pub fn search(
    corpus: &CorpusStore,
    query_text: &str,
    scope: Option<&str>,
    top_k: i64,
) -> Result<RankedResult, QueryError> {
    if top_k <= 0 {
        return Err(QueryError::InvalidArgument(format!(
            "top_k must be >= 1, got {}",
            top_k
        )));
    }

    let query_sig = TermSignature::build(query_text);
    if query_sig.is_empty() {
        return Ok(RankedResult::default());
    }

    let mut hits = match scope {
        Some(doc_id) => {
            let passages = corpus
                .passages_for(doc_id)
                .ok_or_else(|| QueryError::NotFound(format!("document: {}", doc_id)))?;
            score_passages(passages.iter(), &query_sig)
        }
        None => score_passages(corpus.all_passages(), &query_sig),
    };

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.passage.id.cmp(&b.passage.id))
    });
    hits.truncate(top_k as usize);

    Ok(RankedResult { hits })
}

/// Score passages against the query, keeping only term overlap.
fn score_passages<'a>(
    passages: impl Iterator<Item = &'a Passage>,
    query_sig: &TermSignature,
) -> Vec<ScoredPassage> {
    passages
        .filter_map(|passage| {
            let score = query_sig.cosine(&passage.signature);
            if score > 0.0 {
                Some(ScoredPassage {
                    passage: passage.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::make_document;
    use crate::models::DocumentMeta;

    fn store(docs: &[(&str, &str)]) -> CorpusStore {
        CorpusStore::from_documents(
            docs.iter()
                .map(|(id, text)| make_document(id, id, text, DocumentMeta::default()))
                .collect(),
            100,
        )
    }

    #[test]
    fn test_top_k_zero_rejected() {
        let corpus = store(&[("a", "Contract formation requires offer and acceptance.")]);
        let err = search(&corpus, "contract", None, 0).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
        let err = search(&corpus, "contract", None, -3).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_scope_not_found() {
        let corpus = store(&[("a", "Contract formation requires offer and acceptance.")]);
        let err = search(&corpus, "contract", Some("missing"), 5).unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[test]
    fn test_empty_corpus_empty_result() {
        let corpus = store(&[]);
        let result = search(&corpus, "contract law", None, 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_blank_query_empty_result() {
        let corpus = store(&[("a", "Contract formation requires offer and acceptance.")]);
        assert!(search(&corpus, "", None, 5).unwrap().is_empty());
        assert!(search(&corpus, "a of to", None, 5).unwrap().is_empty());
    }

    #[test]
    fn test_no_overlap_dropped() {
        let corpus = store(&[("a", "Contract formation requires offer and acceptance.")]);
        let result = search(&corpus, "maritime salvage rights", None, 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_ranking_descends_and_truncates() {
        let corpus = store(&[
            ("a", "A contract is an agreement. A contract binds the parties. Contract contract contract."),
            ("b", "The word contract appears once among many other unrelated words about procedure."),
            ("c", "Nothing relevant in this document about zoning easements."),
        ]);
        let result = search(&corpus, "contract", None, 5).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.hits[0].score >= result.hits[1].score);
        assert_eq!(result.hits[0].passage.document_id, "a");

        let truncated = search(&corpus, "contract", None, 1).unwrap();
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated.hits[0].passage.id, result.hits[0].passage.id);
    }

    #[test]
    fn test_tie_break_ascending_passage_id() {
        // Same signature, different raw bytes so both survive dedup.
        let corpus = store(&[
            ("b", "Arbitration clauses bind the parties!"),
            ("a", "Arbitration clauses bind the parties."),
        ]);
        let result = search(&corpus, "arbitration", None, 5).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.hits[0].score, result.hits[1].score);
        assert_eq!(result.hits[0].passage.id, "a#0000");
        assert_eq!(result.hits[1].passage.id, "b#0000");
    }

    #[test]
    fn test_scope_restricts_to_document() {
        let corpus = store(&[
            ("a", "Arbitration governs commercial disputes here."),
            ("b", "Arbitration also appears in this other document."),
        ]);
        let result = search(&corpus, "arbitration", Some("b"), 5).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.hits[0].passage.document_id, "b");
    }

    #[test]
    fn test_repeated_search_identical() {
        let corpus = store(&[
            ("a", "Damages compensate the injured party for breach of contract."),
            ("b", "Specific performance is an equitable remedy for breach."),
            ("c", "Rescission unwinds the contract after material breach."),
        ]);
        let first = search(&corpus, "breach of contract remedy", None, 10).unwrap();
        let second = search(&corpus, "breach of contract remedy", None, 10).unwrap();
        assert_eq!(first.len(), second.len());
        for (x, y) in first.hits.iter().zip(second.hits.iter()) {
            assert_eq!(x.passage.id, y.passage.id);
            assert_eq!(x.score, y.score);
        }
    }

    #[test]
    fn test_effective_top_k_clamps_to_ceiling() {
        let params = RetrievalParams {
            default_top_k: 5,
            max_top_k: 50,
        };
        assert_eq!(params.effective_top_k(None), 5);
        assert_eq!(params.effective_top_k(Some(3)), 3);
        assert_eq!(params.effective_top_k(Some(100_000)), 50);
        // Non-positive values pass through for `search` to reject.
        assert_eq!(params.effective_top_k(Some(0)), 0);
        assert_eq!(params.effective_top_k(Some(-3)), -3);
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let corpus = store(&[
            ("a", "Contract contract contract contract."),
            ("b", "A contract needs offer acceptance and consideration to form."),
        ]);
        let result = search(&corpus, "contract", None, 10).unwrap();
        assert!(!result.is_empty());
        for hit in &result.hits {
            assert!(hit.score > 0.0 && hit.score <= 1.0 + f64::EPSILON);
        }
    }
}
