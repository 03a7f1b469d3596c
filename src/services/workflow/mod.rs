//! Workflow
//!
//! Compilation of plans into staged task lists and their execution against
//! file and command collaborators.

pub mod collaborators;
pub mod compiler;
pub mod executor;
pub mod templates;

pub use collaborators::{LocalFileCollaborator, ShellCommandCollaborator};
pub use compiler::WorkflowCompiler;
pub use executor::{TaskExecutor, WorkflowEvent, WorkflowSummary};
