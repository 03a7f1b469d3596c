//! Collaborator Contracts
//!
//! The executor never touches the file system or the shell directly. It goes
//! through these two traits so the pipeline can run against the real project
//! tree, an in-memory fake, or a remote workspace without changes.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

// ============================================================================
// File Collaborator
// ============================================================================

/// Structured failure reported by a file collaborator when a write is refused.
///
/// This is fed back to the generative collaborator verbatim, so the fields are
/// meant to be readable by a model as well as by a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    /// Machine-readable category, e.g. "permission_denied", "invalid_path"
    pub error_type: String,
    /// Human-readable description
    pub message: String,
    /// Concrete things that could be tried instead
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl WriteFailure {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl std::fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

/// Read/write/exists access to a project tree.
///
/// Paths are relative to `root`. Implementations decide how strictly they
/// confine paths to the root.
#[async_trait]
pub trait FileCollaborator: Send + Sync {
    /// Read a file. A missing file is reported as `CoreError::NotFound`.
    async fn read_file(&self, path: &str, root: &Path) -> CoreResult<String>;

    /// Write (create or replace) a file, creating parent directories as needed.
    async fn write_file(&self, path: &str, root: &Path, content: &str) -> Result<(), WriteFailure>;

    /// Whether a file exists at `path`.
    async fn exists(&self, path: &str, root: &Path) -> bool;
}

// ============================================================================
// Command Collaborator
// ============================================================================

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands in a working directory.
#[async_trait]
pub trait CommandCollaborator: Send + Sync {
    /// Run `command` in `cwd`. An `Err` means the command could not be run at
    /// all; a non-zero exit status is reported through `CommandOutput`.
    async fn run(&self, command: &str, cwd: &Path) -> CoreResult<CommandOutput>;
}
