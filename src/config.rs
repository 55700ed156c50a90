//! Engine configuration
//!
//! ```yaml
//! optimize_joins: true
//! fail_on_optimizer_error: false
//! log_query_model: false
//! ```
//!
//! Every key is optional; missing keys take their default.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid YAML for [`EngineConfig`]
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reorder join chains before evaluation
    pub optimize_joins: bool,
    /// Fail the query when the optimizer fails instead of evaluating the tree as is
    pub fail_on_optimizer_error: bool,
    /// Log the query plan before and after optimization
    pub log_query_model: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimize_joins: true,
            fail_on_optimizer_error: false,
            log_query_model: false,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        // An empty document deserializes to unit, not to a mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.optimize_joins);
        assert!(!config.fail_on_optimizer_error);
        assert!(!config.log_query_model);
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let config = EngineConfig::from_yaml_str("optimize_joins: false\n").unwrap();
        assert!(!config.optimize_joins);
        assert!(!config.fail_on_optimizer_error);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = EngineConfig::from_yaml_str("optimise_joins: false\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fail_on_optimizer_error: true").unwrap();
        writeln!(file, "log_query_model: true").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(config.optimize_joins);
        assert!(config.fail_on_optimizer_error);
        assert!(config.log_query_model);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
