//! Deduplicator registry configuration.

/// Record types filtered by the delete-origin-older policy unless configured.
pub const DEFAULT_DELETE_ORIGIN_OLDER_TYPES: &[&str] = &["bolus", "food"];

/// Configuration for the default deduplicator registry.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `TIDEMARK_DEDUP_ORIGIN_OLDER_TYPES` | comma list | `bolus,food` | Types filtered by delete-origin-older |
/// | `TIDEMARK_DEDUP_DROP_HASH_ENABLED` | bool | `true` | Register the drop-hash policy |
///
/// # Example
///
/// ```rust
/// use tidemark::DeduplicatorConfig;
///
/// let config = DeduplicatorConfig::default().with_drop_hash_enabled(false);
/// assert!(!config.drop_hash_enabled);
/// assert_eq!(config.delete_origin_older_types, vec!["bolus", "food"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicatorConfig {
    /// Record types the delete-origin-older policy compares by origin time.
    pub delete_origin_older_types: Vec<String>,

    /// Whether the drop-hash policy is registered.
    pub drop_hash_enabled: bool,
}

impl Default for DeduplicatorConfig {
    fn default() -> Self {
        Self {
            delete_origin_older_types: DEFAULT_DELETE_ORIGIN_OLDER_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            drop_hash_enabled: true,
        }
    }
}

impl DeduplicatorConfig {
    /// Creates a configuration from defaults and environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TIDEMARK_DEDUP_ORIGIN_OLDER_TYPES") {
            self.delete_origin_older_types = parse_list(&v);
        }
        if let Ok(v) = std::env::var("TIDEMARK_DEDUP_DROP_HASH_ENABLED") {
            self.drop_hash_enabled = parse_bool(&v);
        }
        self
    }

    /// Builder method to set the delete-origin-older record types.
    #[must_use]
    pub fn with_delete_origin_older_types(mut self, types: Vec<String>) -> Self {
        self.delete_origin_older_types = types;
        self
    }

    /// Builder method to register or omit the drop-hash policy.
    #[must_use]
    pub const fn with_drop_hash_enabled(mut self, enabled: bool) -> Self {
        self.drop_hash_enabled = enabled;
        self
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeduplicatorConfig::default();
        assert_eq!(config.delete_origin_older_types, vec!["bolus", "food"]);
        assert!(config.drop_hash_enabled);
    }

    #[test]
    fn test_builders() {
        let config = DeduplicatorConfig::default()
            .with_delete_origin_older_types(vec!["cbg".to_string()])
            .with_drop_hash_enabled(false);
        assert_eq!(config.delete_origin_older_types, vec!["cbg"]);
        assert!(!config.drop_hash_enabled);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" bolus, food ,,smbg"), vec!["bolus", "food", "smbg"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("FALSE"));
        assert!(!parse_bool("0"));
    }
}
