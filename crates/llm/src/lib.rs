//! Plan Pilot LLM
//!
//! The generative collaborator seam of the pipeline:
//! - `provider` - the `GenerativeCollaborator` trait
//! - `types` - history messages, generation options, `LlmError`
//! - `stream` - assembling a streamed response into one buffer
//! - `replay` - a collaborator that plays back recorded responses
//!
//! Concrete HTTP adapters for hosted model backends live outside this crate.

pub mod provider;
pub mod replay;
pub mod stream;
pub mod types;

// Re-export main types
pub use provider::GenerativeCollaborator;
pub use replay::{RecordedPrompt, ReplayCollaborator};
pub use stream::{assemble, collect_stream, AssembledText};
pub use types::*;
