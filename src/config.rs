use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    180
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_top_k() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_max_passages")]
    pub max_passages: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_passages: default_max_passages(),
        }
    }
}

fn default_max_passages() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_rate_interval_secs")]
    pub rate_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            ping_interval_ms: default_ping_interval_ms(),
            rate_interval_secs: default_rate_interval_secs(),
        }
    }
}

fn default_window_capacity() -> usize {
    256
}
fn default_ping_interval_ms() -> u64 {
    15_000
}
fn default_rate_interval_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    // Validate retrieval
    if config.retrieval.default_top_k < 1 {
        anyhow::bail!("retrieval.default_top_k must be >= 1");
    }
    if config.retrieval.max_top_k < config.retrieval.default_top_k {
        anyhow::bail!("retrieval.max_top_k must be >= retrieval.default_top_k");
    }

    // Validate synthesis
    if config.synthesis.max_passages < 1 {
        anyhow::bail!("synthesis.max_passages must be >= 1");
    }

    // Validate server
    if config.server.request_timeout_ms == 0 {
        anyhow::bail!("server.request_timeout_ms must be > 0");
    }

    // Validate metrics
    if config.metrics.window_capacity == 0 {
        anyhow::bail!("metrics.window_capacity must be > 0");
    }
    if config.metrics.ping_interval_ms == 0 {
        anyhow::bail!("metrics.ping_interval_ms must be > 0");
    }
    if config.metrics.rate_interval_secs == 0 {
        anyhow::bail!("metrics.rate_interval_secs must be > 0");
    }

    Ok(config)
}
