//! Plan Pilot Core
//!
//! Foundational error types, collaborator contracts, and stream event types for
//! the Plan Pilot workspace. This crate has no dependency on the application
//! crate, the generative collaborator crate, or any storage layer.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `collaborator` - File and command collaborator traits plus their result types
//! - `streaming` - Generation stream events delivered by streaming collaborators

pub mod collaborator;
pub mod error;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Collaborators ──────────────────────────────────────────────────────
pub use collaborator::{CommandCollaborator, CommandOutput, FileCollaborator, WriteFailure};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::GenerationEvent;
