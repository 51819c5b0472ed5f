//! Configuration loading from disk.

use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TracingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading. Fatal at initialization; config
/// problems never surface on the request path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    let mut out = String::new();
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", err);
    }
    out
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TracingConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: TracingConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("tracelink-config-{}.toml", fastrand::u64(..)));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let path = write_temp(
            r#"
            tracing_groups = [["checkout/pay", "checkout/confirm"], ["admin/login"]]
            integrations = ["request"]
            "#,
        );
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.tracing_groups.len(), 2);
        assert_eq!(config.integrations, ["request"]);
    }

    #[test]
    fn test_load_invalid_config_is_fatal() {
        let path = write_temp("tracing_groups = [[]]");
        let err = load_config(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/tracelink.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
