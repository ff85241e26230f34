use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory scanned for source documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the persisted vector index.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_dir: default_index_dir(),
        }
    }
}

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("askdocs")
}

fn default_data_dir() -> PathBuf {
    base_dir().join("data")
}

fn default_index_dir() -> PathBuf {
    base_dir().join("database").join("index")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters of overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours fetched per query.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Minimum cosine similarity for a candidate to enter the context.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Maximum context length in characters before truncation.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    /// Prompt template; `{context}` and `{question}` are substituted verbatim.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            score_threshold: default_score_threshold(),
            max_context_length: default_max_context_length(),
            prompt_template: default_prompt_template(),
        }
    }
}

fn default_k() -> usize {
    7
}
fn default_score_threshold() -> f32 {
    0.4
}
fn default_max_context_length() -> usize {
    6000
}
fn default_prompt_template() -> String {
    "\nAnswer the question based only on the following context:\n\n{context}\n\n---\n\nAnswer the question based on the above context: {question}\n".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Pending chunks that trigger a flush (embed + merge).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Resident memory limit in MB that also triggers a flush; 0 disables the check.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            memory_limit_mb: default_memory_limit_mb(),
        }
    }
}

fn default_batch_size() -> usize {
    1000
}
fn default_memory_limit_mb() -> u64 {
    8000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Model used for embedding chunks and queries.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Model used for answer generation.
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            embedding_model: default_embedding_model(),
            query_model: default_query_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_query_model() -> String {
    "mistral".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    5
}

/// Load configuration from a TOML file, falling back to built-in
/// defaults when the file does not exist.
///
/// The returned [`Config`] is constructed once at startup and passed
/// by reference into each pipeline entry point; no component reads
/// ambient global state.
pub fn load_config(path: &Path) -> Result<Config> {
    let config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.retrieval.score_threshold) {
        anyhow::bail!("retrieval.score_threshold must be in [0.0, 1.0]");
    }

    if config.retrieval.max_context_length == 0 {
        anyhow::bail!("retrieval.max_context_length must be > 0");
    }

    if config.ingest.batch_size == 0 {
        anyhow::bail!("ingest.batch_size must be >= 1");
    }

    Ok(())
}
