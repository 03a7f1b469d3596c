//! Plan Pilot
//!
//! Turns free-form model output into validated, staged, executable plans and
//! drives their execution against a project. It includes:
//! - Data models for plans, tasks, workflows, evaluations and records
//! - Pipeline services (extraction, validation, compilation, execution, and
//!   the clarification and feedback loops)
//! - Storage layer (SQLite planning records, JSON config)
//! - CLI definitions and utilities

pub mod cli;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::plan::{GeneratedPlan, Task, TaskType};
pub use models::settings::{PilotConfig, PilotConfigUpdate};
pub use services::pipeline::{Pipeline, PipelineReport};
pub use utils::error::{AppError, AppResult};
