//! Core Error Types
//!
//! Error types shared by the collaborator contracts. Kept dependency-free
//! (only thiserror + std + serde_json) so every workspace crate can use them.
//!
//! The application crate wraps these in its own `AppError` with the pipeline
//! specific variants (extraction, validation, recursion limits, ...).

use thiserror::Error;

/// Core error type for the Plan Pilot workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A file or record that was expected to exist does not
    #[error("Not found: {0}")]
    NotFound(String),

    /// A path escaped the project root or was otherwise unusable
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Command could not be started or was refused
    #[error("Command error: {0}")]
    Command(String),

    /// Parse errors (manifests, lockfiles, payloads)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether this error means "the thing is not there" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound(_) => true,
            CoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
