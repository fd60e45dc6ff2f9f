//! Error types for the autods pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for autods operations
pub type Result<T> = std::result::Result<T, AutoDsError>;

/// Why a single candidate model could not produce a usable result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub name: String,
    pub reason: String,
}

impl std::fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum AutoDsError {
    /// Invalid or missing target, empty data after cleaning, unsatisfiable settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Raised only when every candidate model failed
    #[error("No valid model: all {} candidates failed ({})", .failures.len(), format_failures(.failures))]
    NoValidModel { failures: Vec<CandidateFailure> },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn format_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<polars::error::PolarsError> for AutoDsError {
    fn from(err: polars::error::PolarsError) -> Self {
        AutoDsError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for AutoDsError {
    fn from(err: serde_json::Error) -> Self {
        AutoDsError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AutoDsError {
    fn from(err: ndarray::ShapeError) -> Self {
        AutoDsError::ShapeMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutoDsError::Configuration("target 'y' not found".to_string());
        assert_eq!(err.to_string(), "Configuration error: target 'y' not found");
    }

    #[test]
    fn test_no_valid_model_lists_every_failure() {
        let err = AutoDsError::NoValidModel {
            failures: vec![
                CandidateFailure { name: "Decision Tree".into(), reason: "empty".into() },
                CandidateFailure { name: "Naive Bayes".into(), reason: "zero variance".into() },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("all 2 candidates failed"));
        assert!(msg.contains("Decision Tree: empty"));
        assert!(msg.contains("Naive Bayes: zero variance"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AutoDsError = io_err.into();
        assert!(matches!(err, AutoDsError::Io(_)));
    }
}
