//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Dependency cycle involving: {0}")]
    DependencyCycle(String),

    #[error("Unknown resource in graph: {0}")]
    UnknownResource(String),
}
