//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Parses a format string, defaulting to JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Directive string the filter was built from.
    pub level: String,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(None)
    }

    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `RUST_LOG` wins over `TIDEMARK_LOG_LEVEL`, which wins over the file.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>) -> Self {
        let format = parse_string_env("TIDEMARK_LOG_FORMAT")
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map(|format| LogFormat::parse(&format))
            .unwrap_or_default();
        let level = parse_string_env("RUST_LOG")
            .or_else(|| parse_string_env("TIDEMARK_LOG_LEVEL"))
            .or_else(|| settings.and_then(|s| s.level.clone()))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let file = parse_string_env("TIDEMARK_LOG_FILE")
            .or_else(|| settings.and_then(|s| s.file.clone()))
            .map(PathBuf::from);

        Self {
            format,
            filter: build_filter(&level),
            level,
            file,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            filter: build_filter(DEFAULT_LOG_LEVEL),
            file: None,
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn parse_string_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("text"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Json);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let filter = build_filter("tidemark=loud");
        assert_eq!(filter.to_string(), "info");
    }
}
