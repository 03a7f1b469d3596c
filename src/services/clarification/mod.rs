//! Clarification
//!
//! Bounded self-correction: detect what blocks a round, tell the model how to
//! resolve it, and resume with the new answer.

pub mod detector;
pub mod directive;
pub mod runner;

pub use detector::detect_questions;
pub use directive::{build_directive, ClarificationTrigger, DirectiveContext};
pub use runner::{ClarificationLoop, ClarificationOutcome, ClarificationRun};
