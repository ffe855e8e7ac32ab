//! Error types for the tutoring core.

use thiserror::Error;

/// Unified error type for tutoring operations.
#[derive(Debug, Error)]
pub enum TutorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session does not exist, has ended, or has expired
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TutorError::SessionNotFound("01HZX".to_string());
        assert!(err.to_string().contains("Session not found"));

        let err = TutorError::InvalidInput("empty message".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty message");
    }

    #[test]
    fn test_from_serde_error() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: TutorError = parse.unwrap_err().into();
        assert!(matches!(err, TutorError::Serialization(_)));
    }
}
