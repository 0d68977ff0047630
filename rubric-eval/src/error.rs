//! Error types for the evaluation engine

use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur during evaluation
#[derive(Error, Debug)]
pub enum EvalError {
    /// Failed to load a dataset or report file
    #[error("Failed to load {path}: {message}")]
    LoadError { path: String, message: String },

    /// Failed to parse a dataset record
    #[error("Failed to parse line {line} of {path}: {message}")]
    ParseError { path: String, line: usize, message: String },

    /// Response generation failed for an example
    #[error("Response generation failed: {0}")]
    GenerationError(String),

    /// Grading an example failed as a whole
    #[error("Grading failed: {0}")]
    GradingError(String),

    /// The first example failed, which is treated as misconfiguration
    #[error("Run aborted on first example '{prompt_id}': {source}")]
    Aborted {
        prompt_id: String,
        #[source]
        source: Box<EvalError>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<rubric_core::RubricError> for EvalError {
    fn from(err: rubric_core::RubricError) -> Self {
        match err {
            rubric_core::RubricError::Config(message) => EvalError::ConfigError(message),
            rubric_core::RubricError::Io(err) => EvalError::IoError(err),
            rubric_core::RubricError::Serde(err) => EvalError::JsonError(err),
            other => EvalError::GenerationError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_message_includes_cause() {
        let err = EvalError::Aborted {
            prompt_id: "p-1".to_string(),
            source: Box::new(EvalError::GenerationError("invalid api key".to_string())),
        };
        let message = err.to_string();
        assert!(message.contains("p-1"));
        assert!(message.contains("invalid api key"));
    }

    #[test]
    fn test_from_core_error() {
        let err: EvalError = rubric_core::RubricError::Model("timeout".to_string()).into();
        assert!(matches!(err, EvalError::GenerationError(ref m) if m.contains("timeout")));

        let err: EvalError = rubric_core::RubricError::Config("no key".to_string()).into();
        assert!(matches!(err, EvalError::ConfigError(_)));
    }
}
