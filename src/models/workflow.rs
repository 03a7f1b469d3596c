//! Workflow Models
//!
//! Stages, task results, clarification requests, and the per-plan workflow
//! context the executor mutates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::plan::{GeneratedPlan, Task, TaskStatus};
use crate::utils::error::AppError;

// ============================================================================
// Stages
// ============================================================================

/// Fixed stage taxonomy, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysis,
    Design,
    ResourceGathering,
    ExecutionPlan,
    Execution,
    Validation,
    Completion,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Analysis,
        Stage::Design,
        Stage::ResourceGathering,
        Stage::ExecutionPlan,
        Stage::Execution,
        Stage::Validation,
        Stage::Completion,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Analysis => write!(f, "Analysis"),
            Stage::Design => write!(f, "Design"),
            Stage::ResourceGathering => write!(f, "Resource Gathering"),
            Stage::ExecutionPlan => write!(f, "Execution Plan"),
            Stage::Execution => write!(f, "Execution"),
            Stage::Validation => write!(f, "Validation"),
            Stage::Completion => write!(f, "Completion"),
        }
    }
}

// ============================================================================
// Clarification Requests
// ============================================================================

/// What went wrong when a collaborator refused an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureContext {
    pub operation: String,
    pub error_message: String,
    pub error_type: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_content_excerpt: Option<String>,
}

/// A question the executor needs answered before it can proceed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationRequest {
    pub target_path: String,
    pub prompt_text: String,
    pub original_request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_context: Option<FailureContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<bool>,
    /// Excerpt of the existing file, or of the content that would be written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl ClarificationRequest {
    /// Error category this request stands for when it cannot be resolved
    pub fn as_error(&self) -> AppError {
        match (&self.failure_context, self.file_exists) {
            (Some(failure), _) => AppError::collaborator(format!(
                "{} {} ({}): {}",
                failure.operation, self.target_path, failure.error_type, failure.error_message
            )),
            (None, Some(_)) => AppError::file_conflict(self.prompt_text.clone()),
            (None, None) => AppError::validation(self.prompt_text.clone()),
        }
    }
}

// ============================================================================
// Task Results
// ============================================================================

/// Outcome of executing one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub clarifications: Vec<ClarificationRequest>,
}

impl TaskResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            clarifications: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            clarifications: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_clarification(mut self, request: ClarificationRequest) -> Self {
        self.clarifications.push(request);
        self
    }

    pub fn needs_clarification(&self) -> bool {
        !self.clarifications.is_empty()
    }
}

// ============================================================================
// Workflow Context
// ============================================================================

/// A source file read during the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// State of one approved plan while it runs.
///
/// Owned by whoever drives the workflow; only the executor mutates it.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub id: String,
    /// The plan being executed
    pub plan: GeneratedPlan,
    /// Raw model text the plan came from, for best-effort inference
    pub raw_response: String,
    /// Compiled tasks in execution order
    pub tasks: Vec<Task>,
    pub results: HashMap<String, TaskResult>,
    /// Files located by find_files (normalized, relative)
    pub found_files: Vec<String>,
    /// Files read by analyze_source
    pub sources: Vec<SourceFile>,
    /// Files the caller already knows are relevant
    pub context_files: Vec<String>,
}

impl WorkflowContext {
    pub fn new(plan: GeneratedPlan, raw_response: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plan,
            raw_response: raw_response.into(),
            tasks,
            results: HashMap::new(),
            found_files: Vec::new(),
            sources: Vec::new(),
            context_files: Vec::new(),
        }
    }

    pub fn with_context_files(mut self, files: Vec<String>) -> Self {
        self.context_files = files;
        self
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.task(id).map(|t| t.status)
    }

    /// Clarification requests raised by any task so far
    pub fn clarifications(&self) -> Vec<ClarificationRequest> {
        self.tasks
            .iter()
            .filter_map(|t| t.result.as_ref())
            .flat_map(|r| r.clarifications.iter().cloned())
            .collect()
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}
