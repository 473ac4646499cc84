//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Unknown source type for sources.{name}: {kind}")]
    UnknownSourceType { name: String, kind: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_display() {
        let err = ConfigError::UnknownSource("extras".to_string());
        assert!(err.to_string().contains("extras"));
        assert!(err.to_string().contains("Unknown source"));
    }

    #[test]
    fn test_unknown_source_type_display() {
        let err = ConfigError::UnknownSourceType {
            name: "main".to_string(),
            kind: "rss".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("sources.main"));
        assert!(display.contains("rss"));
    }

    #[test]
    fn test_missing_field_display() {
        let err = ConfigError::MissingField("sources.main.owner".to_string());
        assert!(err.to_string().contains("sources.main.owner"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_all_error_variants_display() {
        let errors: Vec<ConfigError> = vec![
            ConfigError::NotFound("path".to_string()),
            ConfigError::UnknownSource("name".to_string()),
            ConfigError::UnknownSourceType {
                name: "n".to_string(),
                kind: "k".to_string(),
            },
            ConfigError::MissingField("field".to_string()),
            ConfigError::InvalidValue {
                field: "f".to_string(),
                message: "m".to_string(),
            },
            ConfigError::EnvVarNotSet("VAR".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
