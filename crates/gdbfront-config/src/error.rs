use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, parsing or validating the
/// configuration and its companion files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The specified config file was not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to create the default config file.
    #[error("failed to create default config: {0}")]
    CreateDefault(String),

    /// TOML or template JSON parsing failed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A config value failed validation.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The dotted field path (e.g. `debugger.command`).
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// A platform directory could not be determined.
    #[error("path error: {0}")]
    Path(String),

    /// An I/O error occurred while reading or writing config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_contains_path() {
        let err = ConfigError::NotFound(PathBuf::from("/tmp/missing.toml"));
        let msg = format!("{err}");
        assert!(msg.contains("/tmp/missing.toml"));
        assert!(msg.contains("config file not found"));
    }

    #[test]
    fn parse_display_contains_details() {
        let err = ConfigError::Parse("expected `]`".into());
        assert_eq!(err.to_string(), "parse error: expected `]`");
    }

    #[test]
    fn validation_display_contains_field_and_message() {
        let err = ConfigError::Validation {
            field: "debugger.command".into(),
            message: "must not be empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "validation error: debugger.command: must not be empty"
        );
    }

    #[test]
    fn io_error_converts() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::from(inner);
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}
