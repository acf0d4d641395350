//! Service configuration
//!
//! Built in three layers: compiled-in defaults, an optional YAML file named by
//! `CASH_SEARCH_CONFIG`, then individual environment overrides:
//!
//!   DATABASE_URL                   - Postgres connection string
//!   CASH_SEARCH_BIND_ADDR          - listen address (default: 0.0.0.0:8080)
//!   CASH_SEARCH_SCHEMA             - schema holding the search functions
//!   CASH_SEARCH_MAX_PAGE_SIZE      - upper bound for `size` on /api/search
//!   CASH_SEARCH_DB_MAX_CONNECTIONS - pool size

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "CASH_SEARCH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the search functions live and how to reach them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Schema qualifying the search function names.
    pub schema: String,
    /// Name of the entity-type column in `search_all` output, used for the
    /// include-flag filter.
    pub entity_type_column: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            schema: "cash_management".to_string(),
            entity_type_column: "entity_type".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Request size bounds enforced by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_page_size: u32,
    pub default_page_size: u32,
    pub max_autocomplete_limit: u32,
    pub max_spelling_limit: u32,
    pub max_fuzzy_results: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 10,
            max_autocomplete_limit: 50,
            max_spelling_limit: 20,
            max_fuzzy_results: 100,
        }
    }
}

impl SearchConfig {
    /// Defaults, then the file named by `CASH_SEARCH_CONFIG` (if set), then
    /// environment overrides. The result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = lookup("CASH_SEARCH_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(schema) = lookup("CASH_SEARCH_SCHEMA") {
            self.database.schema = schema;
        }
        if let Some(v) = lookup("CASH_SEARCH_MAX_PAGE_SIZE") {
            self.limits.max_page_size = parse_env("CASH_SEARCH_MAX_PAGE_SIZE", v)?;
        }
        if let Some(v) = lookup("CASH_SEARCH_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CASH_SEARCH_DB_MAX_CONNECTIONS", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        for (name, value) in [
            ("max_page_size", limits.max_page_size),
            ("default_page_size", limits.default_page_size),
            ("max_autocomplete_limit", limits.max_autocomplete_limit),
            ("max_spelling_limit", limits.max_spelling_limit),
            ("max_fuzzy_results", limits.max_fuzzy_results),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("limits.{name} must be > 0")));
            }
        }
        if limits.default_page_size > limits.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "limits.default_page_size ({}) exceeds limits.max_page_size ({})",
                limits.default_page_size, limits.max_page_size
            )));
        }
        // Both are interpolated into SQL text.
        if !is_sql_identifier(&self.database.schema) {
            return Err(ConfigError::Invalid(format!(
                "database.schema '{}' is not a plain identifier",
                self.database.schema
            )));
        }
        if !is_sql_identifier(&self.database.entity_type_column) {
            return Err(ConfigError::Invalid(format!(
                "database.entity_type_column '{}' is not a plain identifier",
                self.database.entity_type_column
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// The connection string; only the server binary needs one.
    pub fn connection_url(&self) -> Result<&str, ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.url is empty (set DATABASE_URL)".into(),
            ));
        }
        Ok(&self.url)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_page_size, 100);
        assert_eq!(config.limits.default_page_size, 10);
        assert_eq!(config.database.schema, "cash_management");
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn yaml_overrides_only_given_fields() {
        let yaml = r#"
limits:
  max_page_size: 50
database:
  schema: search
"#;
        let config = SearchConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.limits.max_page_size, 50);
        assert_eq!(config.limits.default_page_size, 10);
        assert_eq!(config.database.schema, "search");
        assert_eq!(config.database.entity_type_column, "entity_type");
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://db/cash"),
            ("CASH_SEARCH_MAX_PAGE_SIZE", "25"),
            ("CASH_SEARCH_BIND_ADDR", "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();
        let mut config = SearchConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.connection_url().unwrap(), "postgres://db/cash");
        assert_eq!(config.limits.max_page_size, 25);
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn bad_env_number_is_reported() {
        let mut config = SearchConfig::default();
        let err = config
            .apply_env(|k| (k == "CASH_SEARCH_MAX_PAGE_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "CASH_SEARCH_MAX_PAGE_SIZE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_default_page_above_max() {
        let mut config = SearchConfig::default();
        config.limits.default_page_size = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = SearchConfig::default();
        config.limits.max_fuzzy_results = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_fuzzy_results"));
    }

    #[test]
    fn rejects_non_identifier_schema() {
        let mut config = SearchConfig::default();
        config.database.schema = "cash; DROP TABLE payments".into();
        assert!(config.validate().is_err());
        config.database.schema = "_cash_2".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sample_config_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/search.yaml");
        let config = SearchConfig::from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SearchConfig::from_file("/nonexistent/search.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn empty_url_is_rejected_on_use() {
        assert!(DatabaseConfig::default().connection_url().is_err());
    }
}
