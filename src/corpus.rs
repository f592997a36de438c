//! In-memory legal corpus store.
//!
//! The corpus is loaded once at startup from a directory of `*.json`,
//! `*.txt`, and `*.md` files, passages are derived immediately, and the
//! store is immutable for the rest of the process lifetime. Lookups are
//! plain map reads, so concurrent request handlers share the store
//! behind an `Arc` without locking.
//!
//! Files are visited in sorted path order and duplicate content is
//! skipped, which makes load results reproducible run to run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::models::{Document, DocumentMeta, Passage};
use crate::passage::split_passages;

/// One document as it appears in a corpus JSON file.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    text: String,
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// A corpus JSON file holds either a single document or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFile {
    One(RawDocument),
    Many(Vec<RawDocument>),
}

/// Aggregate counts for the startup log line and the `corpus` command.
#[derive(Debug, Clone, Copy)]
pub struct CorpusStats {
    pub documents: usize,
    pub passages: usize,
    pub text_bytes: usize,
}

/// Read-only document and passage store.
pub struct CorpusStore {
    docs: HashMap<String, Document>,
    passages: HashMap<String, Vec<Passage>>,
    /// Document ids in load order, for stable iteration.
    doc_order: Vec<String>,
}

impl CorpusStore {
    /// Load every corpus file under `dir`. A missing directory is not an
    /// error; the gateway can start with an empty corpus and answer
    /// every question with the no-evidence response.
    pub fn load(dir: &Path, max_tokens: usize) -> Result<Self> {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "corpus directory missing, starting empty");
            return Ok(Self::from_documents(Vec::new(), max_tokens));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        let mut documents = Vec::new();
        for path in files {
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => documents.extend(load_json_file(&path)?),
                Some("txt") | Some("md") => documents.push(load_text_file(&path)?),
                _ => {}
            }
        }
        Ok(Self::from_documents(documents, max_tokens))
    }

    /// Build a store from already-constructed documents, splitting each
    /// into passages. Documents repeating earlier content or ids are
    /// skipped with a warning; the first occurrence wins.
    pub fn from_documents(documents: Vec<Document>, max_tokens: usize) -> Self {
        let mut docs = HashMap::new();
        let mut passages = HashMap::new();
        let mut doc_order = Vec::new();
        let mut seen_hashes = HashSet::new();

        for doc in documents {
            if !seen_hashes.insert(doc.content_hash.clone()) {
                tracing::warn!(id = %doc.id, "skipping document with duplicate content");
                continue;
            }
            if docs.contains_key(&doc.id) {
                tracing::warn!(id = %doc.id, "skipping document with duplicate id");
                continue;
            }
            passages.insert(doc.id.clone(), split_passages(&doc.id, &doc.text, max_tokens));
            doc_order.push(doc.id.clone());
            docs.insert(doc.id.clone(), doc);
        }

        Self {
            docs,
            passages,
            doc_order,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id)
    }

    /// Passages of one document in positional order.
    pub fn passages_for(&self, id: &str) -> Option<&[Passage]> {
        self.passages.get(id).map(|p| p.as_slice())
    }

    /// Every passage in the corpus, in document load order then
    /// positional order.
    pub fn all_passages(&self) -> impl Iterator<Item = &Passage> {
        self.doc_order
            .iter()
            .filter_map(move |id| self.passages.get(id))
            .flatten()
    }

    /// Documents in load order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.doc_order.iter().filter_map(move |id| self.docs.get(id))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            documents: self.docs.len(),
            passages: self.passages.values().map(|p| p.len()).sum(),
            text_bytes: self.docs.values().map(|d| d.text.len()).sum(),
        }
    }
}

/// Build a [`Document`] with its content hash filled in.
pub fn make_document(id: &str, title: &str, text: &str, meta: DocumentMeta) -> Document {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Document {
        id: id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        meta,
        content_hash: format!("{:x}", hasher.finalize()),
    }
}

fn load_json_file(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
    let parsed: RawFile = serde_json::from_str(&raw)
        .with_context(|| format!("invalid corpus JSON: {}", path.display()))?;
    let stem = file_stem(path);
    let raws = match parsed {
        RawFile::One(doc) => vec![doc],
        RawFile::Many(docs) => docs,
    };
    let many = raws.len() > 1;

    Ok(raws
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            let id = raw.id.unwrap_or_else(|| {
                if many {
                    format!("{}-{}", stem, idx)
                } else {
                    stem.clone()
                }
            });
            let title = raw.title.unwrap_or_else(|| derive_title(&raw.text, &id));
            let meta = DocumentMeta {
                jurisdiction: raw.jurisdiction,
                doc_type: raw.doc_type,
                date: raw.date,
            };
            make_document(&id, &title, &raw.text, meta)
        })
        .collect())
}

fn load_text_file(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
    let id = file_stem(path);
    let title = derive_title(&text, &id);
    Ok(make_document(&id, &title, &text, DocumentMeta::default()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

/// First non-blank line, capped at 120 characters.
fn derive_title(text: &str, fallback: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(120).collect())
        .unwrap_or_else(|| fallback.to_string())
}
