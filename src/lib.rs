//! # Legal Mind
//!
//! A retrieval-augmented question answering gateway for legal documents.
//!
//! Legal Mind loads a local corpus of legal texts and splits each document
//! into retrievable passages. Questions are answered by ranking passages
//! against the query and synthesizing a cited answer with a confidence
//! score. The same pipeline backs the REST endpoint, the JSON-RPC
//! (MCP-compatible) tool surface, and the `lmind` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐
//! │  REST API   │   │  JSON-RPC   │
//! │   /query    │   │    /mcp     │
//! └──────┬──────┘   └──────┬──────┘
//!        │                 │
//!        └────────┬────────┘
//!                 ▼
//!         ┌───────────────┐     ┌─────────┐
//!         │ Tool Registry │────▶│ Metrics │
//!         └───────┬───────┘     └─────────┘
//!                 ▼
//! ┌─────────┐   ┌───────────┐   ┌───────────┐
//! │ Corpus  │◀──│ Retrieval │──▶│ Synthesis │
//! └─────────┘   └───────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lmind corpus                        # inspect the loaded corpus
//! lmind search "indemnification"      # ranked passages for a query
//! lmind ask "what is consideration"   # synthesized answer with sources
//! lmind serve                         # start the HTTP gateway
//! curl -s localhost:8000/health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`corpus`] | Document loading and passage storage |
//! | [`passage`] | Passage splitting and term signatures |
//! | [`retrieval`] | Lexical passage ranking |
//! | [`synthesis`] | Answer composition and confidence scoring |
//! | [`analyze`] | Structured legal document analysis |
//! | [`registry`] | Tool declarations and dispatch |
//! | [`server`] | REST gateway and request lifecycle |
//! | [`mcp`] | JSON-RPC tool surface |
//! | [`metrics`] | Rolling latency and throughput windows |
//! | [`error`] | Request error taxonomy |

pub mod analyze;
pub mod config;
pub mod corpus;
pub mod error;
pub mod mcp;
pub mod metrics;
pub mod models;
pub mod passage;
pub mod registry;
pub mod retrieval;
pub mod server;
pub mod synthesis;
