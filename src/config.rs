//! TOML configuration.
//!
//! Only `[db]` is required. Every other table falls back to the defaults the
//! engine ships with (500/50 character windows, top-5 retrieval, no
//! threshold, no reranking).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docrank_core::chunk::{ChunkParams, DEFAULT_OVERLAP_CHARS, DEFAULT_WINDOW_CHARS};
use docrank_core::index::IndexParams;
use docrank_core::rerank::RerankWeights;
use docrank_core::search::RetrievalOptions;
use docrank_core::vectorizer::VectorizerParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rerank: RerankWeights,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_chars: DEFAULT_WINDOW_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

fn default_window_chars() -> usize {
    DEFAULT_WINDOW_CHARS
}
fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorizerConfig {
    #[serde(default)]
    pub max_features: Option<usize>,
    #[serde(default = "default_min_term_chars")]
    pub min_term_chars: usize,
    #[serde(default = "default_true")]
    pub stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: None,
            min_term_chars: default_min_term_chars(),
            stop_words: true,
        }
    }
}

fn default_min_term_chars() -> usize {
    2
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub similarity_threshold: f32,
    #[serde(default)]
    pub rerank: bool,
    #[serde(default = "default_oversample")]
    pub oversample: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: 0.0,
            rerank: false,
            oversample: default_oversample(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_oversample() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_file_name_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            file_name_prefix: default_file_name_prefix(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_file_name_prefix() -> String {
    "PROJECT_DOC_".to_string()
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

impl Config {
    /// Config with defaults everywhere and the database at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            chunking: ChunkingConfig::default(),
            vectorizer: VectorizerConfig::default(),
            retrieval: RetrievalConfig::default(),
            rerank: RerankWeights::default(),
            ingest: IngestConfig::default(),
        }
    }

    pub fn chunk_params(&self) -> ChunkParams {
        ChunkParams {
            window_chars: self.chunking.window_chars,
            overlap_chars: self.chunking.overlap_chars,
        }
    }

    pub fn vectorizer_params(&self) -> VectorizerParams {
        VectorizerParams {
            max_features: self.vectorizer.max_features,
            min_term_chars: self.vectorizer.min_term_chars,
            stop_words: self.vectorizer.stop_words,
        }
    }

    pub fn index_params(&self) -> IndexParams {
        IndexParams {
            chunking: self.chunk_params(),
            vectorizer: self.vectorizer_params(),
        }
    }

    /// Retrieval options from `[retrieval]` and `[rerank]`.
    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.retrieval.top_k,
            similarity_threshold: self.retrieval.similarity_threshold,
            oversample: self.retrieval.oversample,
            rerank: self.retrieval.rerank.then(|| self.rerank.clone()),
            vectorizer: self.vectorizer_params(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.window_chars == 0 {
        anyhow::bail!("chunking.window_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.window_chars {
        anyhow::bail!(
            "chunking.overlap_chars ({}) must be smaller than chunking.window_chars ({})",
            config.chunking.overlap_chars,
            config.chunking.window_chars
        );
    }

    if config.vectorizer.min_term_chars == 0 {
        anyhow::bail!("vectorizer.min_term_chars must be >= 1");
    }
    if config.vectorizer.max_features == Some(0) {
        anyhow::bail!("vectorizer.max_features must be > 0 when set");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        anyhow::bail!("retrieval.similarity_threshold must be in [0.0, 1.0]");
    }
    if config.retrieval.oversample < 1 {
        anyhow::bail!("retrieval.oversample must be >= 1");
    }

    if config.ingest.include_globs.is_empty() {
        anyhow::bail!("ingest.include_globs must not be empty");
    }

    Ok(())
}
