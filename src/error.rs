use thiserror::Error;

/// Rep counter error types
#[derive(Error, Debug)]
pub enum RepCounterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session not running")]
    NotRunning,

    #[error("Motion source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for rep counter operations
pub type Result<T> = std::result::Result<T, RepCounterError>;

impl RepCounterError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        RepCounterError::InvalidConfig(msg.into())
    }

    /// True for errors the consumer should surface as "sensor unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepCounterError::SourceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RepCounterError::invalid_config("smoothingAlpha must be in (0, 1]");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: smoothingAlpha must be in (0, 1]"
        );
        assert!(!err.is_unavailable());
        assert!(RepCounterError::SourceUnavailable("no accelerometer".into()).is_unavailable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.jsonl");
        let err: RepCounterError = io.into();
        assert!(matches!(err, RepCounterError::Io(_)));
    }
}
