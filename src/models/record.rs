//! Planning Record Models
//!
//! A saved model response together with the plan recovered from it, scoped to
//! the project it was produced for.

use serde::{Deserialize, Serialize};

use crate::models::plan::GeneratedPlan;

/// Where a planning record is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Draft,
    Validated,
    NeedsInput,
    Executed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Validated => "validated",
            RecordStatus::NeedsInput => "needs_input",
            RecordStatus::Executed => "executed",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "validated" => RecordStatus::Validated,
            "needs_input" => RecordStatus::NeedsInput,
            "executed" => RecordStatus::Executed,
            "failed" => RecordStatus::Failed,
            _ => RecordStatus::Draft,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A saved planning exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRecord {
    pub id: String,
    pub project_path: String,
    pub title: String,
    pub prompt: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<GeneratedPlan>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PlanningRecord {
    pub fn new(
        project_path: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        let prompt = prompt.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_path: project_path.into(),
            title: title_from_prompt(&prompt),
            prompt,
            response: response.into(),
            plan: None,
            status: RecordStatus::Draft,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_plan(mut self, plan: GeneratedPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}

/// First line of the prompt, truncated to 80 characters
fn title_from_prompt(prompt: &str) -> String {
    let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if first_line.chars().count() > 80 {
        let truncated: String = first_line.chars().take(77).collect();
        format!("{}...", truncated)
    } else if first_line.is_empty() {
        "Untitled plan".to_string()
    } else {
        first_line.to_string()
    }
}
