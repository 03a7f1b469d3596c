//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.
//!
//! Only whole-run failures travel as `AppError`. A task that fails is recorded
//! in its `TaskResult`, and an unparseable model response is an extraction
//! outcome, not an error.

use thiserror::Error;

use plan_pilot_core::CoreError;
use plan_pilot_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The generative collaborator failed as a whole
    #[error("Generation error: {0}")]
    Generation(#[from] LlmError),

    /// No structured payload could be recovered where one was required
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Plan failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A create/modify task disagrees with the file system
    #[error("File conflict: {0}")]
    FileConflict(String),

    /// File or command collaborator failure outside a task boundary
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Clarification loop hit its depth limit
    #[error("Clarification depth {depth} exhausted, manual intervention needed")]
    RecursionExhausted { depth: u32 },

    /// Feedback loop ran out of iterations without a usable response
    #[error("Iteration limit {iterations} exhausted: {reason}")]
    IterationExhausted { iterations: u32, reason: String },

    /// Workflow compilation errors (cycles, empty plans)
    #[error("Compile error: {0}")]
    Compile(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Run was cancelled between steps
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a file conflict error
    pub fn file_conflict(msg: impl Into<String>) -> Self {
        Self::FileConflict(msg.into())
    }

    /// Create a collaborator error
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a compile error
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a cancelled error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => AppError::Io(e),
            CoreError::Serialization(e) => AppError::Serialization(e),
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Collaborator(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Database(err.to_string())
    }
}
