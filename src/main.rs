//! # Legal Mind CLI (`lmind`)
//!
//! The `lmind` binary is the primary interface for Legal Mind. It
//! provides commands for inspecting the corpus, running retrieval and
//! question answering from the shell, analyzing documents, and starting
//! the HTTP gateway.
//!
//! ## Usage
//!
//! ```bash
//! lmind --config ./config/lmind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lmind corpus` | Load the corpus and print document/passage statistics |
//! | `lmind search "<query>"` | Rank corpus passages against a query |
//! | `lmind ask "<question>"` | Retrieve and synthesize an answer with citations |
//! | `lmind analyze --file <path>` | Structured analysis of a legal document |
//! | `lmind serve` | Start the HTTP gateway (REST + JSON-RPC) |
//!
//! ## Examples
//!
//! ```bash
//! # Corpus overview
//! lmind corpus --config ./config/lmind.toml
//!
//! # Ranked passages for a query
//! lmind search "termination notice period" --top-k 3
//!
//! # Synthesized answer with confidence and sources
//! lmind ask "what is consideration in contract law"
//!
//! # Analyze a contract from a file
//! lmind analyze --file ./contracts/msa.txt
//!
//! # Analyze a corpus document by id
//! lmind analyze --id contracts
//!
//! # Start the gateway
//! lmind serve --config ./config/lmind.toml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use legal_mind::analyze;
use legal_mind::config::{self, Config};
use legal_mind::corpus::CorpusStore;
use legal_mind::retrieval::{self, RetrievalParams};
use legal_mind::server;
use legal_mind::synthesis::{self, SynthesisParams};

/// Legal Mind CLI: a retrieval-augmented legal question answering
/// gateway.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/lmind.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "lmind",
    about = "Legal Mind: a retrieval-augmented legal question answering gateway",
    version,
    long_about = "Legal Mind answers natural-language legal questions over a REST endpoint and a \
    JSON-RPC tool surface, retrieves relevant passages from a local legal-document corpus, and \
    synthesizes answers with confidence scores and cited sources."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lmind.toml`. Corpus location, retrieval,
    /// synthesis, server, and metrics settings are read from this file.
    #[arg(long, global = true, default_value = "./config/lmind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load the corpus and print statistics.
    ///
    /// Shows document and passage counts plus a per-document table.
    /// Useful for verifying the corpus directory before serving.
    Corpus,

    /// Rank corpus passages against a query.
    ///
    /// Prints scored passages in retrieval order without synthesizing
    /// an answer.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of passages to return.
        #[arg(long)]
        top_k: Option<i64>,

        /// Restrict the search to one document id.
        #[arg(long)]
        doc: Option<String>,
    },

    /// Ask a question and print the synthesized answer.
    ///
    /// Runs the same retrieval and synthesis pipeline as `POST /query`.
    Ask {
        /// The natural-language question.
        question: String,

        /// Maximum number of passages to retrieve.
        #[arg(long)]
        top_k: Option<i64>,
    },

    /// Produce a structured analysis of a legal document.
    ///
    /// Reads the document from a file or from the corpus and prints the
    /// summary, detected clause types, risk terms, numbered sections,
    /// and case citations.
    Analyze {
        /// Path to a text file to analyze.
        #[arg(long, conflicts_with = "id")]
        file: Option<PathBuf>,

        /// Identifier of a corpus document to analyze.
        #[arg(long)]
        id: Option<String>,
    },

    /// Start the HTTP gateway.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the REST and JSON-RPC surfaces until interrupted.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Corpus => run_corpus(&cfg)?,
        Commands::Search { query, top_k, doc } => run_search(&cfg, &query, top_k, doc.as_deref())?,
        Commands::Ask { question, top_k } => run_ask(&cfg, &question, top_k)?,
        Commands::Analyze { file, id } => run_analyze(&cfg, file.as_deref(), id.as_deref())?,
        Commands::Serve => {
            init_tracing();
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_corpus(cfg: &Config) -> anyhow::Result<()> {
    let corpus = CorpusStore::load(&cfg.corpus.dir, cfg.chunking.max_tokens)?;
    let stats = corpus.stats();
    println!("Corpus: {}", cfg.corpus.dir.display());
    println!("  documents: {}", stats.documents);
    println!("  passages:  {}", stats.passages);
    println!("  text:      {} bytes", stats.text_bytes);
    if stats.documents > 0 {
        println!();
        for doc in corpus.documents() {
            let passages = corpus.passages_for(&doc.id).map(|p| p.len()).unwrap_or(0);
            println!("  {:<24} {:>4} passages  {}", doc.id, passages, doc.title);
        }
    }
    Ok(())
}

fn run_search(
    cfg: &Config,
    query: &str,
    top_k: Option<i64>,
    doc: Option<&str>,
) -> anyhow::Result<()> {
    let corpus = CorpusStore::load(&cfg.corpus.dir, cfg.chunking.max_tokens)?;
    let k = retrieval_params(cfg).effective_top_k(top_k);
    let ranked = retrieval::search(&corpus, query, doc, k)?;

    if ranked.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in ranked.hits.iter().enumerate() {
        let title = corpus
            .get(&hit.passage.document_id)
            .map(|d| d.title.as_str())
            .unwrap_or("(untitled)");
        println!(
            "{}. [{:.3}] {} / {}",
            i + 1,
            hit.score,
            hit.passage.document_id,
            title
        );
        println!(
            "    passage: {} (bytes {}..{})",
            hit.passage.id, hit.passage.start, hit.passage.end
        );
        println!("    excerpt: \"{}\"", excerpt(&hit.passage.text));
        println!();
    }
    Ok(())
}

fn run_ask(cfg: &Config, question: &str, top_k: Option<i64>) -> anyhow::Result<()> {
    let corpus = CorpusStore::load(&cfg.corpus.dir, cfg.chunking.max_tokens)?;
    let k = retrieval_params(cfg).effective_top_k(top_k);
    let ranked = retrieval::search(&corpus, question, None, k)?;
    let answer = synthesis::synthesize(
        question,
        &ranked,
        &SynthesisParams {
            max_passages: cfg.synthesis.max_passages,
        },
    );

    println!("{}", synthesis::display_text(&answer));
    println!();
    println!("confidence: {:.2}", answer.confidence);
    if !answer.citations.is_empty() {
        println!("sources:");
        for citation in &answer.citations {
            println!(
                "  {} (bytes {}..{})",
                citation.passage_id, citation.start, citation.end
            );
        }
    }
    Ok(())
}

fn run_analyze(cfg: &Config, file: Option<&Path>, id: Option<&str>) -> anyhow::Result<()> {
    let analysis = match (file, id) {
        (Some(path), None) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            analyze::analyze_text(&text, cfg.chunking.max_tokens)
        }
        (None, Some(doc_id)) => {
            let corpus = CorpusStore::load(&cfg.corpus.dir, cfg.chunking.max_tokens)?;
            analyze::analyze_document(&corpus, doc_id)?
        }
        _ => anyhow::bail!("pass exactly one of --file or --id"),
    };

    println!("summary: {}", analysis.summary);
    println!("clause types: {}", join_or_none(&analysis.clause_types));
    println!("risk terms: {}", join_or_none(&analysis.risk_terms));
    if !analysis.sections.is_empty() {
        println!("sections:");
        for section in &analysis.sections {
            println!("  {} {}", section.number, section.title);
        }
    }
    if !analysis.case_citations.is_empty() {
        println!("citations:");
        for cite in &analysis.case_citations {
            println!("  {}", cite);
        }
    }
    Ok(())
}

/// The configured retrieval knobs, shared with the server's tool path.
fn retrieval_params(cfg: &Config) -> RetrievalParams {
    RetrievalParams {
        default_top_k: cfg.retrieval.default_top_k,
        max_top_k: cfg.retrieval.max_top_k,
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= 160 {
        flat
    } else {
        let cut: String = flat.chars().take(160).collect();
        format!("{}...", cut.trim_end())
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
