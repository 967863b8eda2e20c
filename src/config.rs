//! Lookup client configuration
//!
//! Loaded from YAML with serde defaults for every field, then optionally
//! overridden from the environment.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RISK_LOOKUP_CONFIG";

/// Default configuration path
pub const DEFAULT_CONFIG_PATH: &str = "config/risk_lookup.yaml";

/// Root configuration for the coordinator and its HTTP clients
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LookupConfig {
    /// Endpoint of the lookup service (query passed as `q`)
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,
    /// Base endpoint of the scoring service (candidate id appended as a path segment)
    #[serde(default = "default_scoring_url")]
    pub scoring_url: String,
    /// Input inactivity before a lookup fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum non-whitespace characters before a lookup is issued
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
    /// Explicit request deadline; transport default when absent
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Query parameter carrying the deep-link identifier
    #[serde(default = "default_deep_link_param")]
    pub deep_link_param: String,
    /// Optional result cap forwarded to the lookup service
    #[serde(default)]
    pub result_limit: Option<usize>,
}

fn default_lookup_url() -> String {
    "http://localhost:8080/api/search".to_string()
}

fn default_scoring_url() -> String {
    "http://localhost:8080/api/score".to_string()
}

fn default_debounce_ms() -> u64 {
    350
}

fn default_min_query_chars() -> usize {
    2
}

fn default_deep_link_param() -> String {
    "id".to_string()
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            lookup_url: default_lookup_url(),
            scoring_url: default_scoring_url(),
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
            request_timeout_secs: None,
            deep_link_param: default_deep_link_param(),
            result_limit: None,
        }
    }
}

impl LookupConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: LookupConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `RISK_LOOKUP_URL`, `RISK_SCORING_URL` and `RISK_DEBOUNCE_MS`
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("RISK_LOOKUP_URL") {
            self.lookup_url = url;
        }
        if let Ok(url) = std::env::var("RISK_SCORING_URL") {
            self.scoring_url = url;
        }
        if let Ok(ms) = std::env::var("RISK_DEBOUNCE_MS") {
            self.debounce_ms = ms.parse().map_err(|_| ConfigError::Invalid {
                field: "debounce_ms",
                message: format!("'{}' is not a number of milliseconds", ms),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the coordinator cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "debounce_ms",
                message: "must be greater than zero".into(),
            });
        }
        if self.min_query_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "min_query_chars",
                message: "must be at least 1".into(),
            });
        }
        if self.deep_link_param.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "deep_link_param",
                message: "must not be empty".into(),
            });
        }
        for (field, value) in [
            ("lookup_url", &self.lookup_url),
            ("scoring_url", &self.scoring_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::Invalid {
                field,
                message: format!("'{}': {}", value, e),
            })?;
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LookupConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(350));
        assert_eq!(config.min_query_chars, 2);
        assert_eq!(config.deep_link_param, "id");
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
lookup_url: "https://lookup.example.com/search"
scoring_url: "https://score.example.com/v1/assess"
request_timeout_secs: 10
result_limit: 25
"#;
        let config = LookupConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.lookup_url, "https://lookup.example.com/search");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.result_limit, Some(25));
        // Unspecified fields fall back to defaults
        assert_eq!(config.debounce_ms, 350);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = LookupConfig::from_yaml("{}").unwrap();
        assert_eq!(config, LookupConfig::default());
    }

    #[test]
    fn test_rejects_zero_debounce() {
        let err = LookupConfig::from_yaml("debounce_ms: 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "debounce_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_url() {
        let err = LookupConfig::from_yaml("scoring_url: \"not a url\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scoring_url",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = LookupConfig::from_file("/nonexistent/risk_lookup.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
