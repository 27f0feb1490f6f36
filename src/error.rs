//! Error types for encoding and prediction.
//!
//! Every failure on the request path lands in one of four buckets (see
//! [`ErrorKind`]) so that callers can tell "bad request" apart from
//! "retry later".

use thiserror::Error;

/// Main error type for dpe-predict operations.
///
/// # Examples
///
/// ```
/// use dpe_predict::error::DpeError;
///
/// let err = DpeError::UnrecognizedCategory {
///     feature: "qualite_isolation_murs".to_string(),
///     value: "excellente".to_string(),
/// };
/// assert!(err.to_string().contains("excellente"));
/// ```
#[derive(Debug, Error)]
pub enum DpeError {
    /// The request payload is malformed or a field has the wrong type.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Offending field (or `<body>` for the whole payload)
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// A categorical value is outside the vocabulary the model was trained on.
    #[error("Unrecognized category for '{feature}': '{value}'")]
    UnrecognizedCategory {
        /// Feature name
        feature: String,
        /// Raw value received
        value: String,
    },

    /// Model artifacts are not loaded (still loading, or loading failed).
    #[error("Service unavailable: model is {state}")]
    ServiceUnavailable {
        /// Readiness state at the time of the call
        state: String,
    },

    /// Unexpected failure inside the encode/predict path.
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// Vector or matrix dimensions don't line up.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Artifact is readable but structurally wrong.
    #[error("Invalid artifact: {message}")]
    FormatError {
        /// Error description
        message: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

/// Caller-facing classification of a [`DpeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed payload or missing required field. Not retryable.
    InvalidInput,
    /// Value outside the trained vocabulary. Not retryable.
    UnrecognizedCategory,
    /// Model not ready. Retry after backoff.
    ServiceUnavailable,
    /// Anything else on the encode/predict path.
    PredictionError,
}

impl DpeError {
    /// Create an invalid-input error for a field
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a format error for a malformed artifact
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Other(format!("empty input: {context}"))
    }

    /// Bucket this error into the serving taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnrecognizedCategory { .. } => ErrorKind::UnrecognizedCategory,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Prediction(_)
            | Self::DimensionMismatch { .. }
            | Self::FormatError { .. }
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Other(_) => ErrorKind::PredictionError,
        }
    }
}

impl From<&str> for DpeError {
    fn from(msg: &str) -> Self {
        DpeError::Other(msg.to_string())
    }
}

impl From<String> for DpeError {
    fn from(msg: String) -> Self {
        DpeError::Other(msg)
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, DpeError>;
