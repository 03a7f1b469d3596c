//! Services
//!
//! Business logic of the pipeline, leaves first:
//! - `extraction` - payload isolation and repair
//! - `validation` - semantic checks on extracted plans
//! - `inference` - best-effort guessing from free text
//! - `workflow` - compilation and execution of tasks
//! - `generation` - single model requests, streamed or not
//! - `iteration` - the quality feedback loop
//! - `clarification` - the bounded self-correction loop
//! - `session` - the session registry
//! - `pipeline` - the facade tying them together

pub mod clarification;
pub mod extraction;
pub mod generation;
pub mod inference;
pub mod iteration;
pub mod pipeline;
pub mod session;
pub mod validation;
pub mod workflow;

pub use clarification::{ClarificationLoop, ClarificationOutcome, ClarificationRun};
pub use extraction::{extract_plan, ExtractionOutcome};
pub use inference::{BestEffortInference, HeuristicInference};
pub use iteration::{FeedbackEvent, FeedbackLoop, ResponseEvaluator};
pub use pipeline::{DryRun, Pipeline, PipelineReport};
pub use session::{Session, SessionRegistry};
pub use validation::{PlanValidator, ProjectTreeOracle, ValidationReport};
pub use workflow::{TaskExecutor, WorkflowCompiler, WorkflowEvent, WorkflowSummary};
