//! Repository configuration with precedence handling
//!
//! Values are layered defaults, then the JSON config file, then
//! `SHARDCACHE_*` environment variables.

use serde::{Deserialize, Serialize};
use shardcache_core::{Error, ReadMode, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Settings that shape a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Name attached to every tracing event the repository emits
    pub name: String,
    /// Initial capacity of each shard's map
    pub shard_capacity: usize,
    /// Read mode used by the `*_default` read helpers
    pub default_read_mode: ReadMode,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: "shardcache".to_string(),
            shard_capacity: 64,
            default_read_mode: ReadMode::DeepClone,
        }
    }
}

/// Partial configuration as found in a file or the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfigOverrides {
    pub name: Option<String>,
    pub shard_capacity: Option<usize>,
    pub read_mode: Option<ReadMode>,
}

impl RepositoryConfigOverrides {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.shard_capacity.is_none() && self.read_mode.is_none()
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
}

/// Resolved configuration plus where its last layer came from
#[derive(Debug, Clone, Serialize)]
pub struct LoadedConfig {
    pub config: RepositoryConfig,
    pub source: ConfigSource,
}

/// Builder for creating repository configurations
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfigBuilder {
    config: RepositoryConfig,
}

impl RepositoryConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repository name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the initial per-shard capacity
    pub fn with_shard_capacity(mut self, capacity: usize) -> Self {
        self.config.shard_capacity = capacity;
        self
    }

    /// Set the default read mode
    pub fn with_default_read_mode(mut self, mode: ReadMode) -> Self {
        self.config.default_read_mode = mode;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RepositoryConfig {
        self.config
    }
}

/// Configuration loader that handles precedence
pub struct RepositoryConfigLoader;

impl RepositoryConfigLoader {
    pub const ENV_NAME: &'static str = "SHARDCACHE_NAME";
    pub const ENV_SHARD_CAPACITY: &'static str = "SHARDCACHE_SHARD_CAPACITY";
    pub const ENV_READ_MODE: &'static str = "SHARDCACHE_READ_MODE";

    /// Load configuration from the default config file location and the environment
    pub fn load() -> Result<LoadedConfig> {
        let path = Self::config_file_path()?;
        Self::load_with_file(&path)
    }

    /// Load configuration using an explicit config file path
    pub fn load_with_file(path: &Path) -> Result<LoadedConfig> {
        let mut loaded = LoadedConfig {
            config: RepositoryConfig::default(),
            source: ConfigSource::Default,
        };

        if let Some(file_overrides) = Self::load_from_config_file(path)? {
            loaded = Self::merge(
                loaded,
                file_overrides,
                ConfigSource::ConfigFile(path.to_path_buf()),
            );
        }

        if let Some(env_overrides) = Self::load_from_env()? {
            loaded = Self::merge(
                loaded,
                env_overrides,
                ConfigSource::EnvironmentVariable("SHARDCACHE_*".to_string()),
            );
        }

        tracing::debug!(source = ?loaded.source, config = ?loaded.config, "repository config resolved");
        Ok(loaded)
    }

    /// Read the `repository` object of a JSON config file, if the file exists
    fn load_from_config_file(path: &Path) -> Result<Option<RepositoryConfigOverrides>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(format!("read config file {}", path.display()), e))?;

        #[derive(Deserialize)]
        struct ConfigFile {
            #[serde(default)]
            repository: RepositoryConfigOverrides,
        }

        let file: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        if file.repository.is_empty() {
            Ok(None)
        } else {
            Ok(Some(file.repository))
        }
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Option<RepositoryConfigOverrides>> {
        let mut overrides = RepositoryConfigOverrides::default();

        if let Ok(name) = std::env::var(Self::ENV_NAME) {
            overrides.name = Some(name);
        }

        if let Ok(capacity) = std::env::var(Self::ENV_SHARD_CAPACITY) {
            let capacity = capacity.parse::<usize>().map_err(|e| {
                Error::configuration(format!(
                    "{} must be a non-negative integer: {e}",
                    Self::ENV_SHARD_CAPACITY
                ))
            })?;
            overrides.shard_capacity = Some(capacity);
        }

        if let Ok(mode) = std::env::var(Self::ENV_READ_MODE) {
            overrides.read_mode = Some(mode.parse()?);
        }

        if overrides.is_empty() {
            Ok(None)
        } else {
            Ok(Some(overrides))
        }
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config_home)
        } else {
            dirs::config_dir().ok_or_else(|| {
                Error::configuration("could not determine config directory; set XDG_CONFIG_HOME")
            })?
        };

        Ok(config_dir.join("shardcache").join("config.json"))
    }

    fn merge(
        base: LoadedConfig,
        overrides: RepositoryConfigOverrides,
        source: ConfigSource,
    ) -> LoadedConfig {
        let mut config = base.config;

        if let Some(name) = overrides.name {
            config.name = name;
        }

        if let Some(capacity) = overrides.shard_capacity {
            config.shard_capacity = capacity;
        }

        if let Some(mode) = overrides.read_mode {
            config.default_read_mode = mode;
        }

        LoadedConfig { config, source }
    }
}
