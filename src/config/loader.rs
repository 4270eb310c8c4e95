//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, validate_paths, ValidationError};
use crate::masking::paths::{PathConfig, SanitizePolicy};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
///
/// Path segment collisions are logged, not rejected.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    let paths = sanitized_paths(&config);
    if let Err(collisions) = validate_paths(&paths, &config.layout) {
        for collision in collisions {
            tracing::warn!(%collision, "Ambiguous path masks; first match wins");
        }
    }

    Ok(config)
}

/// The sanitized `PathConfig` for a loaded configuration.
pub fn sanitized_paths(config: &ProxyConfig) -> PathConfig {
    PathConfig::sanitize(
        &config.paths,
        SanitizePolicy {
            allow_empty_comments: config.masking.allow_empty_comments,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::paths::PathRole;

    #[test]
    fn parses_and_sanitizes() {
        let config = parse_config(
            r#"
            [paths]
            content = "/My Assets/"
            uploads = "../../etc"
            "#,
        )
        .unwrap();
        let paths = sanitized_paths(&config);
        assert_eq!(paths.get(PathRole::Content), "MyAssets");
        assert_eq!(paths.get(PathRole::Uploads), "uploads");
    }

    #[test]
    fn collisions_still_load() {
        let config = parse_config(
            r#"
            [paths]
            content = "static"
            uploads = "static"
            "#,
        );
        assert!(config.is_ok());
    }

    #[test]
    fn semantic_errors_reject() {
        let err = parse_config(
            r#"
            [upstream]
            address = "localhost"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("upstream.address"));
    }

    #[test]
    fn syntax_errors_reject() {
        assert!(matches!(parse_config("[paths"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
