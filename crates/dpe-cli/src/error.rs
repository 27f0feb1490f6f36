//! Error types for the dpe CLI.

use dpe_predict::DpeError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Model directory or input file missing
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input file isn't a usable record
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more artifact checks failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Artifacts could not be loaded
    #[error("Model load failed: {0}")]
    ModelLoadFailed(String),

    /// Encoding or prediction failed
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// Socket or runtime failure
    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound(_) => ExitCode::from(3),
            Self::InvalidInput(_) => ExitCode::from(4),
            Self::ValidationFailed(_) => ExitCode::from(5),
            Self::ModelLoadFailed(_) => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
            Self::PredictionFailed(_) => ExitCode::from(8),
            Self::Server(_) => ExitCode::from(10),
        }
    }
}

impl From<DpeError> for CliError {
    fn from(e: DpeError) -> Self {
        match e {
            DpeError::InvalidInput { .. } | DpeError::UnrecognizedCategory { .. } => {
                Self::InvalidInput(e.to_string())
            }
            _ => Self::PredictionFailed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            CliError::FileNotFound(PathBuf::from("models")),
            CliError::InvalidInput("x".into()),
            CliError::ValidationFailed("x".into()),
            CliError::ModelLoadFailed("x".into()),
            CliError::Io(std::io::Error::other("x")),
            CliError::PredictionFailed("x".into()),
            CliError::Server("x".into()),
        ];
        let codes: Vec<String> = errors.iter().map(|e| format!("{:?}", e.exit_code())).collect();
        for (i, code) in codes.iter().enumerate() {
            assert!(!codes[i + 1..].contains(code), "duplicate exit code {code}");
        }
    }

    #[test]
    fn test_category_errors_are_user_errors() {
        let err: CliError = DpeError::UnrecognizedCategory {
            feature: "logement".into(),
            value: "Récent".into(),
        }
        .into();
        assert!(matches!(err, CliError::InvalidInput(_)));

        let err: CliError = DpeError::Prediction("nan".into()).into();
        assert!(matches!(err, CliError::PredictionFailed(_)));
    }
}
