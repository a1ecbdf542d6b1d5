//! Session configuration

use std::path::Path;

use rowmap_core::error::{RowmapError, RowmapResult};
use serde::Deserialize;

/// Session settings, usually read from a `rowmap.toml` file.
///
/// ```toml
/// database_url = "sqlite://app.db?mode=rwc"
/// alias_table_prefix = false
/// log_statements = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowmapConfig {
    /// sqlx connection URL
    pub database_url: String,

    /// Alias projected columns as `{tableAlias}_{column}`
    #[serde(default)]
    pub alias_table_prefix: bool,

    /// Log every executed statement at debug level
    #[serde(default)]
    pub log_statements: bool,

    /// Serialize commits of all session transactions
    #[serde(default = "default_true")]
    pub single_flight_commit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RowmapConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            alias_table_prefix: false,
            log_statements: false,
            single_flight_commit: true,
        }
    }
}

impl RowmapConfig {
    pub fn builder() -> RowmapConfigBuilder {
        RowmapConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> RowmapResult<Self> {
        toml::from_str(content).map_err(|e| RowmapError::Settings(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> RowmapResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Builder for RowmapConfig
#[derive(Debug, Default)]
pub struct RowmapConfigBuilder {
    config: RowmapConfig,
}

impl RowmapConfigBuilder {
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn alias_table_prefix(mut self, enabled: bool) -> Self {
        self.config.alias_table_prefix = enabled;
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.config.log_statements = enabled;
        self
    }

    pub fn single_flight_commit(mut self, enabled: bool) -> Self {
        self.config.single_flight_commit = enabled;
        self
    }

    pub fn build(self) -> RowmapConfig {
        self.config
    }
}
