//! Error types for the history engines.

use crate::patch::Path;
use thiserror::Error;

/// Main error type for history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("Path not found: {0}")]
    PathNotFound(Path),

    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of bounds at {path} (len {len})")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Value cannot be represented structurally: {0}")]
    Unrepresentable(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl HistoryError {
    /// Build a host-defined mutation failure.
    pub fn mutation(reason: impl Into<String>) -> Self {
        HistoryError::Mutation(reason.into())
    }

    /// Whether this error belongs to the diff family: the mutation failed
    /// or produced something that cannot be diffed. The engine state is
    /// unchanged after any of these.
    pub fn is_diff_error(&self) -> bool {
        matches!(
            self,
            HistoryError::Mutation(_)
                | HistoryError::PathNotFound(_)
                | HistoryError::TypeMismatch { .. }
                | HistoryError::IndexOutOfBounds { .. }
                | HistoryError::InvalidPatch(_)
                | HistoryError::Unrepresentable(_)
        )
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Serialization(e.to_string())
    }
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Name of a JSON value's kind, for error messages.
pub fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
