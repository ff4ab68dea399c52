//! Error types for topology composition.

use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors that can occur while composing the topology.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Port mismatch: {target} declares port {declared} but the task exposes {expected}")]
    PortMismatch {
        target: String,
        declared: u16,
        expected: u16,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Core error: {0}")]
    Core(#[from] gantry_core::CoreError),

    #[error("Cloud error: {0}")]
    Cloud(#[from] gantry_cloud::CloudError),
}
