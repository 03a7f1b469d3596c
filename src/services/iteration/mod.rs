//! Iteration
//!
//! The feedback loop that hardens a prompt until the model's answer is usable:
//! - `evaluator` - weighted 0-100 scoring of a response
//! - `prompt_enhancer` - follow-up prompts built from an evaluation
//! - `feedback` - the bounded generate/score/enhance loop

pub mod evaluator;
pub mod feedback;
pub mod prompt_enhancer;

pub use evaluator::{ResponseEvaluator, ScoredResponse};
pub use feedback::{ensure_usable, FeedbackEvent, FeedbackLoop};
pub use prompt_enhancer::enhance;
