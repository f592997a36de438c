//! Fixed tool registry shared by both protocol surfaces.
//!
//! The gateway exposes a closed set of three tools, so the registry is a
//! tagged enum rather than a trait object table: names resolve to a
//! [`ToolKind`], raw JSON arguments parse into typed parameters, and
//! execution is a pure function of the parsed call and the shared
//! [`ToolContext`]. Both the REST adapter and the JSON-RPC adapter
//! funnel into [`ToolCall`] before anything runs, which keeps the two
//! surfaces behaviorally identical.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::analyze;
use crate::corpus::CorpusStore;
use crate::error::QueryError;
use crate::retrieval::{self, RetrievalParams};
use crate::synthesis::{self, SynthesisParams};

/// The closed set of invocable tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    AskLegalQuestion,
    AnalyzeLegalDocument,
    SearchLegalDatabase,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::AskLegalQuestion,
        ToolKind::AnalyzeLegalDocument,
        ToolKind::SearchLegalDatabase,
    ];

    /// Resolve a tool name. An unknown name is a caller error.
    pub fn resolve(name: &str) -> Result<ToolKind, QueryError> {
        match name {
            "ask_legal_question" => Ok(ToolKind::AskLegalQuestion),
            "analyze_legal_document" => Ok(ToolKind::AnalyzeLegalDocument),
            "search_legal_database" => Ok(ToolKind::SearchLegalDatabase),
            other => Err(QueryError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::AskLegalQuestion => "ask_legal_question",
            ToolKind::AnalyzeLegalDocument => "analyze_legal_document",
            ToolKind::SearchLegalDatabase => "search_legal_database",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::AskLegalQuestion => {
                "Answer a natural-language legal question from the corpus, with confidence and cited sources"
            }
            ToolKind::AnalyzeLegalDocument => {
                "Produce a structured analysis of a legal document: summary, clause types, risk terms, sections, and citations"
            }
            ToolKind::SearchLegalDatabase => {
                "Rank corpus passages against a query without synthesizing an answer"
            }
        }
    }

    /// JSON Schema for the tool's arguments, served through `initialize`
    /// and `tools/list`.
    pub fn input_schema(&self) -> Value {
        match self {
            ToolKind::AskLegalQuestion => json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "Natural-language legal question"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Maximum number of passages to retrieve",
                        "default": 5
                    }
                },
                "required": ["question"]
            }),
            ToolKind::AnalyzeLegalDocument => json!({
                "type": "object",
                "properties": {
                    "document_text": {
                        "type": "string",
                        "description": "Raw document text to analyze"
                    },
                    "document_id": {
                        "type": "string",
                        "description": "Identifier of a corpus document to analyze instead"
                    }
                }
            }),
            ToolKind::SearchLegalDatabase => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Maximum number of passages to return",
                        "default": 5
                    },
                    "document_id": {
                        "type": "string",
                        "description": "Restrict the search to one document"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

/// Wire form of a tool declaration.
#[derive(Debug, Serialize)]
pub struct ToolDecl {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Declarations for every registered tool, in registry order.
pub fn declared_tools() -> Vec<ToolDecl> {
    ToolKind::ALL
        .iter()
        .map(|kind| ToolDecl {
            name: kind.name(),
            description: kind.description(),
            input_schema: kind.input_schema(),
        })
        .collect()
}

/// Parameters for `ask_legal_question`.
#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// Parameters for `analyze_legal_document`. Exactly one of the two
/// fields must be present.
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub document_text: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

/// Parameters for `search_legal_database`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<i64>,
    #[serde(default)]
    pub document_id: Option<String>,
}

/// One parsed tool invocation, the single internal request form.
#[derive(Debug)]
pub enum ToolCall {
    Ask(AskParams),
    Analyze(AnalyzeParams),
    Search(SearchParams),
}

impl ToolCall {
    /// Parse raw JSON arguments against the resolved tool's parameter
    /// type. Absent arguments are treated as an empty object.
    pub fn parse(kind: ToolKind, arguments: Value) -> Result<ToolCall, QueryError> {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        match kind {
            ToolKind::AskLegalQuestion => Ok(ToolCall::Ask(params(kind, arguments)?)),
            ToolKind::AnalyzeLegalDocument => Ok(ToolCall::Analyze(params(kind, arguments)?)),
            ToolKind::SearchLegalDatabase => Ok(ToolCall::Search(params(kind, arguments)?)),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolCall::Ask(_) => ToolKind::AskLegalQuestion.name(),
            ToolCall::Analyze(_) => ToolKind::AnalyzeLegalDocument.name(),
            ToolCall::Search(_) => ToolKind::SearchLegalDatabase.name(),
        }
    }
}

fn params<T: DeserializeOwned>(kind: ToolKind, arguments: Value) -> Result<T, QueryError> {
    serde_json::from_value(arguments)
        .map_err(|e| QueryError::InvalidArgument(format!("{}: {}", kind.name(), e)))
}

/// Everything tool execution needs, shared across requests.
pub struct ToolContext {
    pub corpus: Arc<CorpusStore>,
    pub retrieval: RetrievalParams,
    pub synthesis: SynthesisParams,
    /// Passage size limit used when analyzing ad hoc text.
    pub passage_max_tokens: usize,
}

/// One search hit in wire form.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub passage_id: String,
    pub document_id: String,
    pub document_title: String,
    pub score: f64,
    pub start: usize,
    pub end: usize,
    pub snippet: String,
}

/// Execute a parsed call against the corpus. Pure CPU work; the server
/// runs it on a blocking worker under the request deadline.
pub fn execute(call: &ToolCall, ctx: &ToolContext) -> Result<Value, QueryError> {
    match call {
        ToolCall::Ask(params) => exec_ask(params, ctx),
        ToolCall::Analyze(params) => exec_analyze(params, ctx),
        ToolCall::Search(params) => exec_search(params, ctx),
    }
}

fn exec_ask(params: &AskParams, ctx: &ToolContext) -> Result<Value, QueryError> {
    if params.question.trim().is_empty() {
        return Err(QueryError::InvalidArgument(
            "question must not be empty".to_string(),
        ));
    }
    let top_k = ctx.retrieval.effective_top_k(params.top_k);
    let ranked = retrieval::search(&ctx.corpus, &params.question, None, top_k)?;
    let answer = synthesis::synthesize(&params.question, &ranked, &ctx.synthesis);
    Ok(json!({
        "answer": synthesis::display_text(&answer),
        "confidence": answer.confidence,
        "sources": answer.citations,
        "no_evidence": answer.no_evidence,
    }))
}

fn exec_analyze(params: &AnalyzeParams, ctx: &ToolContext) -> Result<Value, QueryError> {
    let analysis = match (&params.document_text, &params.document_id) {
        (Some(_), Some(_)) => {
            return Err(QueryError::InvalidArgument(
                "pass either document_text or document_id, not both".to_string(),
            ));
        }
        (None, None) => {
            return Err(QueryError::InvalidArgument(
                "either document_text or document_id is required".to_string(),
            ));
        }
        (Some(text), None) => {
            if text.trim().is_empty() {
                return Err(QueryError::InvalidArgument(
                    "document_text must not be empty".to_string(),
                ));
            }
            analyze::analyze_text(text, ctx.passage_max_tokens)
        }
        (None, Some(id)) => analyze::analyze_document(&ctx.corpus, id)?,
    };
    serde_json::to_value(&analysis).map_err(|e| QueryError::Internal(e.to_string()))
}

fn exec_search(params: &SearchParams, ctx: &ToolContext) -> Result<Value, QueryError> {
    if params.query.trim().is_empty() {
        return Err(QueryError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }
    let top_k = ctx.retrieval.effective_top_k(params.top_k);
    let ranked = retrieval::search(
        &ctx.corpus,
        &params.query,
        params.document_id.as_deref(),
        top_k,
    )?;

    let hits: Vec<SearchHit> = ranked
        .hits
        .iter()
        .map(|hit| SearchHit {
            passage_id: hit.passage.id.clone(),
            document_id: hit.passage.document_id.clone(),
            document_title: ctx
                .corpus
                .get(&hit.passage.document_id)
                .map(|doc| doc.title.clone())
                .unwrap_or_default(),
            score: hit.score,
            start: hit.passage.start,
            end: hit.passage.end,
            snippet: snippet(&hit.passage.text),
        })
        .collect();

    Ok(json!({ "hits": hits, "total": hits.len() }))
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= 240 {
        flat
    } else {
        flat.chars().take(240).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::make_document;
    use crate::models::DocumentMeta;

    fn context(docs: &[(&str, &str)]) -> ToolContext {
        ToolContext {
            corpus: Arc::new(CorpusStore::from_documents(
                docs.iter()
                    .map(|(id, text)| make_document(id, id, text, DocumentMeta::default()))
                    .collect(),
                100,
            )),
            retrieval: RetrievalParams {
                default_top_k: 5,
                max_top_k: 50,
            },
            synthesis: SynthesisParams { max_passages: 3 },
            passage_max_tokens: 100,
        }
    }

    #[test]
    fn test_resolve_known_tools() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::resolve(kind.name()).unwrap(), kind);
        }
        assert!(matches!(
            ToolKind::resolve("no_such_tool"),
            Err(QueryError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_declared_tools_complete() {
        let decls = declared_tools();
        assert_eq!(decls.len(), 3);
        let names: Vec<&str> = decls.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["ask_legal_question", "analyze_legal_document", "search_legal_database"]
        );
        for decl in &decls {
            assert_eq!(decl.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        let err = ToolCall::parse(ToolKind::AskLegalQuestion, json!({"question": 7})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
        let err = ToolCall::parse(ToolKind::SearchLegalDatabase, json!({})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
        // Null arguments read as an empty object, so optional-only tools parse.
        assert!(ToolCall::parse(ToolKind::AnalyzeLegalDocument, Value::Null).is_ok());
    }

    #[test]
    fn test_ask_returns_answer_with_sources() {
        let ctx = context(&[(
            "contracts",
            "A contract is a legally binding agreement between parties. A contract requires \
             offer, acceptance, and consideration.",
        )]);
        let call = ToolCall::parse(
            ToolKind::AskLegalQuestion,
            json!({"question": "what is a contract"}),
        )
        .unwrap();
        let payload = execute(&call, &ctx).unwrap();
        assert_eq!(payload["no_evidence"], false);
        assert!(payload["confidence"].as_f64().unwrap() > 0.0);
        assert!(!payload["sources"].as_array().unwrap().is_empty());
        assert_eq!(payload["sources"][0]["document_id"], "contracts");
    }

    #[test]
    fn test_ask_empty_corpus_is_no_evidence_not_error() {
        let ctx = context(&[]);
        let call = ToolCall::parse(
            ToolKind::AskLegalQuestion,
            json!({"question": "what is a contract"}),
        )
        .unwrap();
        let payload = execute(&call, &ctx).unwrap();
        assert_eq!(payload["no_evidence"], true);
        assert_eq!(payload["confidence"].as_f64().unwrap(), 0.0);
        assert!(payload["sources"].as_array().unwrap().is_empty());
        assert!(payload["answer"].as_str().unwrap().contains("rephrasing"));
    }

    #[test]
    fn test_ask_blank_question_rejected() {
        let ctx = context(&[("a", "Some corpus text about the law.")]);
        let call =
            ToolCall::parse(ToolKind::AskLegalQuestion, json!({"question": "   "})).unwrap();
        assert!(matches!(
            execute(&call, &ctx),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_returns_ranked_hits_only() {
        let ctx = context(&[
            ("a", "Arbitration clauses require binding arbitration of disputes."),
            ("b", "Payment is due within thirty days of invoice."),
        ]);
        let call = ToolCall::parse(
            ToolKind::SearchLegalDatabase,
            json!({"query": "arbitration", "top_k": 5}),
        )
        .unwrap();
        let payload = execute(&call, &ctx).unwrap();
        let hits = payload["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["document_id"], "a");
        assert!(payload.get("answer").is_none());
        assert!(payload.get("confidence").is_none());
    }

    #[test]
    fn test_search_top_k_zero_rejected() {
        let ctx = context(&[("a", "Some corpus text about the law.")]);
        let call = ToolCall::parse(
            ToolKind::SearchLegalDatabase,
            json!({"query": "law", "top_k": 0}),
        )
        .unwrap();
        assert!(matches!(
            execute(&call, &ctx),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_top_k_clamped_to_ceiling() {
        let ctx = context(&[
            ("a", "Arbitration text one for the ranking."),
            ("b", "Arbitration text two for the ranking!"),
        ]);
        let call = ToolCall::parse(
            ToolKind::SearchLegalDatabase,
            json!({"query": "arbitration", "top_k": 100000}),
        )
        .unwrap();
        let payload = execute(&call, &ctx).unwrap();
        assert!(payload["hits"].as_array().unwrap().len() <= 50);
    }

    #[test]
    fn test_analyze_requires_exactly_one_input() {
        let ctx = context(&[("a", "Some corpus text about the law.")]);
        let both = ToolCall::parse(
            ToolKind::AnalyzeLegalDocument,
            json!({"document_text": "x", "document_id": "a"}),
        )
        .unwrap();
        assert!(matches!(
            execute(&both, &ctx),
            Err(QueryError::InvalidArgument(_))
        ));
        let neither = ToolCall::parse(ToolKind::AnalyzeLegalDocument, json!({})).unwrap();
        assert!(matches!(
            execute(&neither, &ctx),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_analyze_unknown_document() {
        let ctx = context(&[("a", "Some corpus text about the law.")]);
        let call = ToolCall::parse(
            ToolKind::AnalyzeLegalDocument,
            json!({"document_id": "missing"}),
        )
        .unwrap();
        assert!(matches!(execute(&call, &ctx), Err(QueryError::NotFound(_))));
    }

    #[test]
    fn test_analyze_text_payload_shape() {
        let ctx = context(&[]);
        let call = ToolCall::parse(
            ToolKind::AnalyzeLegalDocument,
            json!({"document_text": "Section 1. Arbitration\nDisputes go to binding arbitration at the sole discretion of the vendor."}),
        )
        .unwrap();
        let payload = execute(&call, &ctx).unwrap();
        assert!(payload["summary"].as_str().is_some());
        assert!(payload["clause_types"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "arbitration"));
        assert!(payload["risk_terms"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "sole discretion"));
    }
}
