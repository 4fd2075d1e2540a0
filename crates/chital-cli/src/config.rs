use chital::{OllamaConfig, SessionSettings};
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    /// Keep threads for this run only
    #[serde(default)]
    pub in_memory: bool,
}

impl StorageConfig {
    /// Directory holding thread files, `None` when running in memory
    pub fn threads_dir(&self) -> Result<Option<PathBuf>, ConfigError> {
        if self.in_memory {
            return Ok(None);
        }

        match &self.data_dir {
            Some(dir) => Ok(Some(dir.clone())),
            None => dirs::data_dir()
                .map(|dir| Some(dir.join("chital").join("threads")))
                .ok_or_else(|| ConfigError::Message("Could not determine data directory".to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{CHITAL_ENV}.toml (if CHITAL_ENV is set)
    /// 3. Environment variables such as `CHITAL__OLLAMA__BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("CHITAL_ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CHITAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        builder.build()?.try_deserialize()
    }
}
