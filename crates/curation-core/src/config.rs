//! Configuration management for the curation engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};

mod sub_configs;

pub use sub_configs::{IndexConfig, LoggingConfig, ScoringConfig, StorageConfig, TasksConfig};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{CURATION_ENV}.toml (environment-specific)
    /// 3. Environment variables with CURATION prefix (`CURATION__SCORING__N_RANDOM_SAMPLES=25`)
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("CURATION_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(::config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(::config::Environment::with_prefix("CURATION").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        self.logging.validate()?;
        self.scoring.validate()?;
        self.tasks.validate()?;
        self.index.validate()?;

        match self.storage.backend.as_str() {
            "memory" => {}
            "rocksdb" => {
                let path = PathBuf::from(&self.storage.path);
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        return Err(CoreError::ConfigError(format!(
                            "storage.path parent directory does not exist: {}",
                            parent.display()
                        )));
                    }
                }
            }
            other => {
                return Err(CoreError::ConfigError(format!(
                    "storage.backend must be 'memory' or 'rocksdb', got '{}'",
                    other
                )));
            }
        }

        Ok(())
    }
}
