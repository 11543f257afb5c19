//! Error types shared across jobboard crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, JobboardError>;

/// Errors raised by shared infrastructure (configuration parsing, logging setup)
#[derive(Error, Debug)]
pub enum JobboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl JobboardError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = JobboardError::config("LOG_LEVEL must be one of trace, debug, info");
        assert_eq!(
            err.to_string(),
            "Configuration error: LOG_LEVEL must be one of trace, debug, info"
        );
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: JobboardError = parse.unwrap_err().into();
        assert!(matches!(err, JobboardError::Serialization(_)));
    }
}
