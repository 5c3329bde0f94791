//! # Engine Configuration
//!
//! Operating limits for query execution and condition loading. Values come from
//! defaults, an optional TOML file and `ELEMENT_QUERY_*` environment overrides, in
//! that order of precedence.

use crate::constants::system;
use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows fetched per storage round trip by a cursor
    pub page_size: u64,
    /// Maximum nesting depth accepted when loading a serialized condition
    pub max_condition_depth: usize,
    /// Maximum size of a serialized condition definition
    pub max_serialized_bytes: usize,
    /// Emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: system::DEFAULT_PAGE_SIZE,
            max_condition_depth: system::MAX_CONDITION_DEPTH,
            max_serialized_bytes: system::MAX_SERIALIZED_CONDITION_BYTES,
            json_logs: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment overrides only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!("Loading engine configuration from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let loaded: Self = builder
            .add_source(config::Environment::with_prefix("ELEMENT_QUERY").try_parsing(true))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check the loaded values describe a usable engine
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(QueryError::configuration(
                "EngineConfig",
                "page_size must be greater than zero",
            ));
        }
        if self.max_condition_depth == 0 {
            return Err(QueryError::configuration(
                "EngineConfig",
                "max_condition_depth must be greater than zero",
            ));
        }
        if self.max_serialized_bytes == 0 {
            return Err(QueryError::configuration(
                "EngineConfig",
                "max_serialized_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 100);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "page_size = 25").unwrap();
        writeln!(file, "json_logs = true").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.page_size, 25);
        assert!(config.json_logs);
        assert_eq!(config.max_condition_depth, system::MAX_CONDITION_DEPTH);
    }

    #[test]
    fn test_invalid_page_size_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "page_size = 0").unwrap();

        let err = EngineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));
    }
}
