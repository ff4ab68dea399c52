//! Error types for cloud engine operations.

use thiserror::Error;

/// Result type alias for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors surfaced by a cloud engine.
///
/// Provisioning failures carry the identity of the failing resource so the
/// operator can act on them; nothing here is retried by this system.
#[derive(Error, Debug, Clone)]
pub enum CloudError {
    #[error("Quota exceeded while provisioning {resource}")]
    QuotaExceeded { resource: String },

    #[error("Permission denied for {resource}")]
    PermissionDenied { resource: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Cannot destroy {resource}: still referenced by {dependents}")]
    ResourceInUse { resource: String, dependents: String },

    #[error("Identity resolution failed: {0}")]
    Identity(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CloudError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CloudError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
