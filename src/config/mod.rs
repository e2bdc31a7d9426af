// Configuration management module
// Handles the TOML configuration file and runtime settings

pub mod settings;

pub use settings::{
    Config, ConfigError, EmbeddingsConfig, LlmConfig, ServerConfig, VectorIndexConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::DirectoryError)?;
    Ok(base.join("tripsure"))
}
