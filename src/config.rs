use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    800
}
fn default_overlap_tokens() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Worker count for batch embedding. Clamped to a minimum of 1.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            concurrency: default_concurrency(),
            base_url: default_base_url(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_concurrency() -> usize {
    4
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_completion_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_max_chars: default_context_max_chars(),
        }
    }
}

fn default_top_k() -> i64 {
    6
}
fn default_context_max_chars() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// TTL for answers backed by retrieved context.
    #[serde(default = "default_answer_ttl_minutes")]
    pub answer_ttl_minutes: i32,
    /// Shorter TTL for the no-results sentinel answer.
    #[serde(default = "default_empty_ttl_minutes")]
    pub empty_ttl_minutes: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            answer_ttl_minutes: default_answer_ttl_minutes(),
            empty_ttl_minutes: default_empty_ttl_minutes(),
        }
    }
}

fn default_answer_ttl_minutes() -> i32 {
    120
}
fn default_empty_ttl_minutes() -> i32 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_max_chars")]
    pub max_chars: usize,
    /// A word-boundary cut is only taken past this offset; otherwise the
    /// preview is cut hard at the budget.
    #[serde(default = "default_min_word_cut")]
    pub min_word_cut: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_chars: default_preview_max_chars(),
            min_word_cut: default_min_word_cut(),
        }
    }
}

fn default_preview_max_chars() -> usize {
    700
}
fn default_min_word_cut() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_entry_error: EntryErrorPolicy,
}

/// What the batch does when a single entry fails to extract, embed, or persist.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryErrorPolicy {
    /// Fail the whole batch on the first entry error.
    #[default]
    Abort,
    /// Log the failed entry and continue with the rest of the batch.
    Skip,
}

impl Config {
    /// Build a config with defaults for everything except the database URL.
    /// Useful for embedding the pipeline in another binary or in tests.
    pub fn for_database(url: impl Into<String>) -> Self {
        Self {
            db: DbConfig {
                url: url.into(),
                max_connections: default_max_connections(),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            retrieval: RetrievalConfig::default(),
            cache: CacheConfig::default(),
            preview: PreviewConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.url.trim().is_empty() {
        anyhow::bail!("db.url must not be empty");
    }

    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.concurrency == 0 {
        anyhow::bail!("embedding.concurrency must be >= 1");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.cache.answer_ttl_minutes <= 0 || config.cache.empty_ttl_minutes <= 0 {
        anyhow::bail!("cache TTLs must be > 0 minutes");
    }

    if config.preview.max_chars <= config.preview.min_word_cut {
        anyhow::bail!("preview.max_chars must be greater than preview.min_word_cut");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cqa.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let (_dir, path) = write_config(
            r#"[db]
url = "postgres://localhost/corpusqa"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.max_tokens, 800);
        assert_eq!(config.chunking.overlap_tokens, 80);
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.cache.answer_ttl_minutes, 120);
        assert_eq!(config.cache.empty_ttl_minutes, 30);
        assert_eq!(config.preview.max_chars, 700);
        assert_eq!(config.ingest.on_entry_error, EntryErrorPolicy::Abort);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"[db]
url = "postgres://localhost/corpusqa"

[chunking]
max_tokens = 400
overlap_tokens = 40

[cache]
answer_ttl_minutes = 60

[ingest]
on_entry_error = "skip"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.max_tokens, 400);
        assert_eq!(config.chunking.overlap_tokens, 40);
        assert_eq!(config.cache.answer_ttl_minutes, 60);
        assert_eq!(config.cache.empty_ttl_minutes, 30);
        assert_eq!(config.ingest.on_entry_error, EntryErrorPolicy::Skip);
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let (_dir, path) = write_config(
            r#"[db]
url = "postgres://localhost/corpusqa"

[chunking]
max_tokens = 0
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn preview_budget_must_exceed_word_cut_floor() {
        let (_dir, path) = write_config(
            r#"[db]
url = "postgres://localhost/corpusqa"

[preview]
max_chars = 300
min_word_cut = 400
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
