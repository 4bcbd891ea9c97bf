//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by environment
//! variables. Every section is optional.
//!
//! ```toml
//! [deduplicator]
//! delete_origin_older_types = ["bolus", "food"]
//! drop_hash_enabled = true
//!
//! [logging]
//! format = "json"
//! level = "tidemark=debug,info"
//! file = "/var/log/tidemark/engine.log"
//! ```

use crate::services::deduplicator::DeduplicatorConfig;
use serde::Deserialize;
use std::path::Path;

/// Main configuration for tidemark.
#[derive(Debug, Clone, Default)]
pub struct TidemarkConfig {
    /// Deduplicator registry configuration.
    pub deduplicator: DeduplicatorConfig,
    /// Logging settings as read from the file.
    pub logging: LoggingSettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Deduplicator section.
    pub deduplicator: Option<ConfigFileDeduplicator>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Deduplicator section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDeduplicator {
    /// Record types filtered by the delete-origin-older policy.
    pub delete_origin_older_types: Option<Vec<String>>,
    /// Whether the drop-hash policy is registered.
    pub drop_hash_enabled: Option<bool>,
}

/// Logging section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSettings {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// Filter directives, e.g. `info` or `tidemark=debug`.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl TidemarkConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::parse(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parses configuration from TOML text, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn parse(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let mut config = Self::from_config_file(file);
        config.deduplicator = config.deduplicator.with_env_overrides();
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `tidemark/config.toml` in the platform config dir. Returns
    /// the environment-derived configuration if no file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::from_env();
        };

        let path = base_dirs.config_dir().join("tidemark").join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::from_env()
    }

    /// Builds configuration from defaults and environment variables only.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            deduplicator: DeduplicatorConfig::from_env(),
            logging: LoggingSettings::default(),
        }
    }

    /// Converts a `ConfigFile` to `TidemarkConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(deduplicator) = file.deduplicator {
            if let Some(types) = deduplicator.delete_origin_older_types {
                config.deduplicator = config.deduplicator.with_delete_origin_older_types(types);
            }
            if let Some(enabled) = deduplicator.drop_hash_enabled {
                config.deduplicator = config.deduplicator.with_drop_hash_enabled(enabled);
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }
}
