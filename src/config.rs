//! TOML configuration.
//!
//! Every section except `[input]` has defaults, so a config file can be
//! as small as:
//!
//! ```toml
//! [input]
//! root = "./chats"
//! ```
//!
//! See `config/chatvec.example.toml` for every option.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use chatvec_core::classify::{LineClassifier, DEFAULT_SYSTEM_KEYWORDS};
use chatvec_core::timestamp::TimestampBounds;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Where chat exports are read from.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// A directory to walk, or a single export file.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

/// Line classification heuristics.
#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_system_keywords")]
    pub system_keywords: Vec<String>,
    #[serde(default = "default_timestamp_min_len")]
    pub timestamp_min_len: usize,
    #[serde(default = "default_timestamp_max_len")]
    pub timestamp_max_len: usize,
    #[serde(default = "default_timestamp_max_digits")]
    pub timestamp_max_digits: usize,
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            system_keywords: default_system_keywords(),
            timestamp_min_len: default_timestamp_min_len(),
            timestamp_max_len: default_timestamp_max_len(),
            timestamp_max_digits: default_timestamp_max_digits(),
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

fn default_system_keywords() -> Vec<String> {
    DEFAULT_SYSTEM_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}
fn default_timestamp_min_len() -> usize {
    TimestampBounds::default().min_len
}
fn default_timestamp_max_len() -> usize {
    TimestampBounds::default().max_len
}
fn default_timestamp_max_digits() -> usize {
    TimestampBounds::default().max_digits
}
fn default_min_year() -> i32 {
    TimestampBounds::default().min_year
}
fn default_max_year() -> i32 {
    TimestampBounds::default().max_year
}

impl ClassifierConfig {
    /// Build the classifier these settings describe.
    pub fn build(&self) -> LineClassifier {
        LineClassifier::new(
            &self.system_keywords,
            TimestampBounds {
                min_len: self.timestamp_min_len,
                max_len: self.timestamp_max_len,
                max_digits: self.timestamp_max_digits,
                min_year: self.min_year,
                max_year: self.max_year,
            },
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding `vectors.idx`, `metadata.json` and `manifest.json`.
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
        }
    }
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/index")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            input: None,
            classifier: ClassifierConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate classifier
    let c = &config.classifier;
    if c.timestamp_min_len > c.timestamp_max_len {
        anyhow::bail!("classifier.timestamp_min_len must be <= classifier.timestamp_max_len");
    }
    if c.min_year > c.max_year {
        anyhow::bail!("classifier.min_year must be <= classifier.max_year");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "hash" => {
            if config.embedding.dims.is_none() {
                anyhow::bail!("embedding.dims must be set when provider is 'hash'");
            }
        }
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() {
                anyhow::bail!(
                    "embedding.dims must be set when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, openai, ollama, or hash.",
            other
        ),
    }

    Ok(config)
}
