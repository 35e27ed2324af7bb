//! Configuration types for mysql-mimic.
//!
//! Configuration is loaded from a YAML file (`mimic.yaml`):
//!
//! ```yaml
//! server:
//!   version: 8.0.29
//!   default_database: shop
//!
//! # Either inline...
//! schema:
//!   shop:
//!     customers:
//!       id: INT
//!       name: {type: TEXT, comment: "display name", is_nullable: false}
//!
//! # ...or in a separate file, resolved relative to this one.
//! # schema_file: schema.yaml
//!
//! variables:
//!   sql_mode: TRADITIONAL
//! ```

pub mod server;

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use server::ServerConfig;

/// Complete mysql-mimic configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MimicConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,

    /// Inline schema mapping: `{column: type}`, `{table: {column: type}}` or
    /// `{schema: {table: {column: type}}}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,

    /// Path to a YAML or JSON file holding the schema mapping (alternative to inline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_file: Option<PathBuf>,

    /// Overrides for system variable defaults.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MimicConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve `schema_file` relative to the config file.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(schema_file) = &config.schema_file {
            let schema_path = if schema_file.is_absolute() {
                schema_file.clone()
            } else {
                base_dir.join(schema_file)
            };

            let content = fs::read_to_string(&schema_path)?;
            // YAML is a superset of JSON, so one parser covers both file kinds.
            config.schema = Some(serde_yaml::from_str(&content)?);
        }

        Ok(config)
    }

    /// The schema mapping, if one was configured.
    pub fn schema_mapping(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.is_some() && self.schema_file.is_some() {
            return Err(ConfigError::Config(
                "`schema` and `schema_file` are mutually exclusive".to_string(),
            ));
        }
        if self.server.version.trim().is_empty() {
            return Err(ConfigError::Config(
                "server.version must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
