//! Config file loading - the models.json catalog document

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Model;

/// Default catalog file location, overridable via `CONFIG_PATH`
pub const DEFAULT_CONFIG_PATH: &str = "configs/models.json";

/// The complete models.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model definitions, order preserved
    pub models: Vec<Model>,
}

/// Config file error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Document is not valid JSON or contains unknown field types
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and parse a models.json document.
///
/// Unknown field types are rejected here: `FieldType` is a closed set and
/// deserialization fails on anything outside it.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ModelConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_round_trip() {
        let doc = r#"
        {
          "models": [
            {
              "name": "users",
              "table": "users",
              "primaryKey": "id",
              "fields": [
                { "name": "id", "type": "uuid", "nullable": false },
                { "name": "email", "type": "string", "nullable": false }
              ]
            }
          ]
        }
        "#;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(doc.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].name, "users");
        assert_eq!(config.models[0].fields.len(), 2);
    }

    #[test]
    fn test_load_config_rejects_unknown_type() {
        let doc = r#"
        {
          "models": [
            {
              "name": "users",
              "table": "users",
              "primaryKey": "id",
              "fields": [ { "name": "id", "type": "varchar", "nullable": false } ]
            }
          ]
        }
        "#;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(doc.as_bytes()).unwrap();

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/models.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
