
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: u32 = 64;
pub const DEFAULT_NEIGHBOR_COUNT: u32 = 5;
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Model used for the turn classifier and grounded answers.
    pub chat_model: String,
    /// Cheaper model used for the one-off welcome message.
    pub welcome_model: String,
    /// How many prior turns of history feed the classifier.
    pub history_limit: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            welcome_model: "gpt-5-nano".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub base_url: String,
    pub model: String,
    pub batch_size: u32,
    pub dimension: u32,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_seconds: 30,
        }
    }
}

/// Remote nearest-neighbor index. An empty endpoint disables the remote
/// path entirely, so every lookup goes through the local fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub endpoint: String,
    pub deployed_index_id: String,
    pub neighbor_count: u32,
    pub timeout_seconds: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployed_index_id: "insurances_index_v1".to_string(),
            neighbor_count: DEFAULT_NEIGHBOR_COUNT,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be nonzero)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid neighbor count: {0} (must be between 1 and 100)")]
    InvalidNeighborCount(u32),
    #[error("Invalid history limit: {0} (must be between 1 and 100)")]
    InvalidHistoryLimit(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                server: ServerConfig::default(),
                llm: LlmConfig::default(),
                embeddings: EmbeddingsConfig::default(),
                vector_index: VectorIndexConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.llm.validate()?;
        self.embeddings.validate()?;
        self.vector_index.validate()?;
        Ok(())
    }

    /// Path of the SQLite store backing plans, settings, and the
    /// conversation mirror.
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join("tripsure.db")
    }

    #[inline]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn validate_base_url(url: &str) -> Result<(), ConfigError> {
    Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    Ok(())
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=300).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        Ok(())
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }
        if self.welcome_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.welcome_model.clone()));
        }
        if self.history_limit == 0 || self.history_limit > 100 {
            return Err(ConfigError::InvalidHistoryLimit(self.history_limit));
        }
        validate_timeout(self.timeout_seconds)?;
        Ok(())
    }
}

impl EmbeddingsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }
        validate_timeout(self.timeout_seconds)?;
        Ok(())
    }
}

impl VectorIndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.is_empty() {
            validate_base_url(&self.endpoint)?;
        }
        if self.neighbor_count == 0 || self.neighbor_count > 100 {
            return Err(ConfigError::InvalidNeighborCount(self.neighbor_count));
        }
        validate_timeout(self.timeout_seconds)?;
        Ok(())
    }

    /// Whether a remote index is configured at all.
    #[inline]
    pub fn is_remote_enabled(&self) -> bool {
        !self.endpoint.is_empty()
    }
}
