//! Plan Validator
//!
//! Schema and semantic checks over an extracted plan. Produces two kinds of
//! findings:
//! - hard issues, which block execution and are fed back to the model
//! - clarification questions, raised when an existence oracle disagrees with
//!   what the plan intends to do to a file
//!
//! Validation is pure: the only outside knowledge comes from the optional
//! `ExistenceOracle`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;

use plan_pilot_project::BuildTool;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::plan::{GeneratedPlan, TaskType};
use crate::models::settings::PilotConfig;
use crate::services::extraction::{find_fenced_blocks, ExtractionOutcome};
use crate::utils::paths::{has_traversal, normalize_path};

/// Normalized paths shorter than this are rejected
const MIN_PATH_LEN: usize = 3;

// ============================================================================
// Report
// ============================================================================

/// Category of a hard validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NotStructured,
    MissingField,
    MissingExecutionOrder,
    MissingPackages,
    InvalidPath,
    MissingCoverage,
    DuplicateCoverage,
    UncoveredCodeBlock,
    ContentTooShort,
    PlaceholderContent,
    BuildToolMismatch,
}

/// One hard issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// File the issue is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationIssue {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
        }
    }

    fn at(kind: IssueKind, path: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: Some(path.to_string()),
        }
    }
}

/// Everything the validator found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub questions: Vec<String>,
}

impl ValidationReport {
    /// No hard issues (questions may still be pending)
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }

    /// Ready to compile: no hard issues and nothing to ask
    pub fn is_clean(&self) -> bool {
        self.is_valid() && !self.has_questions()
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Bullet list of issues and questions, for feeding back to the model
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.issues.iter().map(|i| format!("- {}", i.message)).collect();
        lines.extend(self.questions.iter().map(|q| format!("- {}", q)));
        lines.join("\n")
    }
}

// ============================================================================
// Existence Oracle
// ============================================================================

/// Answers whether a normalized project-relative path exists
pub trait ExistenceOracle: Send + Sync {
    fn exists(&self, path: &str) -> bool;
}

impl ExistenceOracle for HashSet<String> {
    fn exists(&self, path: &str) -> bool {
        self.contains(path)
    }
}

/// Oracle backed by a project directory on disk
#[derive(Debug, Clone)]
pub struct ProjectTreeOracle {
    root: PathBuf,
}

impl ProjectTreeOracle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExistenceOracle for ProjectTreeOracle {
    fn exists(&self, path: &str) -> bool {
        !has_traversal(path) && self.root.join(path).is_file()
    }
}

// ============================================================================
// Validator
// ============================================================================

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)(?:^\s*(?://|#|/\*)?\s*\.\.\.\s*(?:\*/)?\s*$|\.\.\.\s*(?:existing|rest of|remaining)\b|\b(?:your|add your|insert)\s+(?:code|implementation|logic)\s+here\b|\bimplementation\s+goes\s+here\b|\bTODO:?\s*implement\b|\bplaceholder\s+(?:code|content)\b)",
        )
        .ok()
    })
    .as_ref()
}

/// Whether a block body is placeholder text rather than real content
pub fn is_placeholder(content: &str) -> bool {
    placeholder_regex().is_some_and(|re| re.is_match(content))
}

/// Checks plans against the configured thresholds
#[derive(Debug, Clone)]
pub struct PlanValidator {
    min_code_block_chars: usize,
    max_response_chars_without_block: usize,
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self::from_config(&PilotConfig::default())
    }
}

impl PlanValidator {
    pub fn from_config(config: &PilotConfig) -> Self {
        Self {
            min_code_block_chars: config.min_code_block_chars,
            max_response_chars_without_block: config.max_response_chars_without_block,
        }
    }

    /// Validate a raw response together with its extraction outcome.
    ///
    /// A short response with no payload is not an issue: the caller treats it
    /// as plain text.
    pub fn validate_response(
        &self,
        text: &str,
        outcome: &ExtractionOutcome,
        oracle: Option<&dyn ExistenceOracle>,
    ) -> ValidationReport {
        match outcome.plan() {
            Some(plan) => self.validate(plan, oracle),
            None => {
                let mut report = ValidationReport::default();
                let chars = text.chars().count();
                if chars > self.max_response_chars_without_block && find_fenced_blocks(text).is_empty() {
                    report.issues.push(ValidationIssue::new(
                        IssueKind::NotStructured,
                        format!(
                            "Response is {} characters of unstructured text with no fenced block; reply with a single fenced JSON plan",
                            chars
                        ),
                    ));
                }
                report
            }
        }
    }

    /// Validate an extracted plan
    pub fn validate(&self, plan: &GeneratedPlan, oracle: Option<&dyn ExistenceOracle>) -> ValidationReport {
        let mut report = ValidationReport::default();
        report.questions.extend(plan.questions.iter().cloned());

        // The model is still asking; nothing executable to check yet
        if plan.needs_clarification() && plan.tasks.as_ref().map_or(true, Vec::is_empty) {
            return report;
        }

        self.check_structure(plan, &mut report);
        self.check_packages(plan, &mut report);
        self.check_paths(plan, &mut report);
        self.check_coverage(plan, &mut report);
        self.check_content(plan, &mut report);
        self.check_build_tools(plan, &mut report);
        if let Some(oracle) = oracle {
            self.check_existence(plan, oracle, &mut report);
        }

        tracing::debug!(
            issues = report.issues.len(),
            questions = report.questions.len(),
            "Validated plan"
        );
        report
    }

    fn check_structure(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        let has_tasks = plan.tasks.as_ref().is_some_and(|t| !t.is_empty());
        match &plan.plan {
            None if !has_tasks => report.issues.push(ValidationIssue::new(
                IssueKind::MissingField,
                "Payload has neither a `plan` object nor a `tasks` list",
            )),
            Some(details) => {
                let has_order = details.execution_order.as_ref().is_some_and(|o| !o.is_empty());
                if !has_order && !has_tasks {
                    report.issues.push(ValidationIssue::new(
                        IssueKind::MissingExecutionOrder,
                        "plan.executionOrder is missing or empty",
                    ));
                }
                if details.action_type.is_none() {
                    report.issues.push(ValidationIssue::new(
                        IssueKind::MissingField,
                        "plan.actionType is missing or not one of CREATE, MODIFY, DELETE, ADD, REPLACE",
                    ));
                }
            }
            None => {}
        }
    }

    fn check_packages(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        let tasks = plan.tasks.as_deref().unwrap_or(&[]);
        let install_tasks: Vec<_> = tasks.iter().filter(|t| t.task_type == TaskType::Install).collect();
        let install_subtasks = plan
            .plan
            .as_ref()
            .map(|p| {
                p.sub_tasks
                    .iter()
                    .filter(|s| s.task_type == Some(TaskType::Install))
                    .count()
            })
            .unwrap_or(0);
        let order_mentions_install = plan
            .plan
            .as_ref()
            .and_then(|p| p.execution_order.as_ref())
            .is_some_and(|order| order.iter().any(|s| s.to_lowercase().contains("install")));

        let implied = !install_tasks.is_empty() || install_subtasks > 0 || order_mentions_install;
        if !implied || !plan.packages().is_empty() {
            return;
        }

        let named_elsewhere = install_tasks
            .iter()
            .any(|t| t.target.as_deref().is_some_and(|s| !s.trim().is_empty()) || t.command.is_some())
            || plan
                .plan
                .as_ref()
                .is_some_and(|p| p.sub_tasks.iter().any(|s| s.task_type == Some(TaskType::Install) && s.target.is_some()));
        if !named_elsewhere {
            report.issues.push(ValidationIssue::new(
                IssueKind::MissingPackages,
                "An install step is planned but plan.packages names no packages",
            ));
        }
    }

    fn check_paths(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        let Some(details) = &plan.plan else { return };
        for file in details.files_to_create.iter().chain(details.files_to_modify.iter()) {
            let normalized = normalize_path(&file.path);
            let problem = if normalized.is_empty() {
                Some("is empty")
            } else if file.path.contains(['*', '?']) {
                Some("contains a wildcard")
            } else if has_traversal(&normalized) {
                Some("climbs out of the project with `..`")
            } else if normalized.len() < MIN_PATH_LEN {
                Some("is too short to be a file path")
            } else {
                None
            };
            if let Some(problem) = problem {
                report.issues.push(ValidationIssue::at(
                    IssueKind::InvalidPath,
                    &file.path,
                    format!("File path `{}` {}", file.path, problem),
                ));
            }
        }
    }

    fn check_coverage(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        let planned = plan.planned_paths();
        if planned.is_empty() {
            return;
        }

        for path in &planned {
            if path.is_empty() {
                continue;
            }
            let count = plan
                .code_blocks
                .iter()
                .filter(|b| normalize_path(&b.file_path) == *path)
                .count();
            match count {
                0 => report.issues.push(ValidationIssue::at(
                    IssueKind::MissingCoverage,
                    path,
                    format!("No code block provided for {}", path),
                )),
                1 => {}
                n => report.issues.push(ValidationIssue::at(
                    IssueKind::DuplicateCoverage,
                    path,
                    format!("{} code blocks provided for {}; expected exactly one", n, path),
                )),
            }
        }

        for block in &plan.code_blocks {
            let path = normalize_path(&block.file_path);
            if !planned.contains(&path) {
                report.issues.push(ValidationIssue::at(
                    IssueKind::UncoveredCodeBlock,
                    &path,
                    format!(
                        "Code block for {} is not listed in filesToCreate or filesToModify",
                        path
                    ),
                ));
            }
        }
    }

    fn check_content(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        for block in &plan.code_blocks {
            let path = normalize_path(&block.file_path);
            if is_placeholder(&block.content) {
                report.issues.push(ValidationIssue::at(
                    IssueKind::PlaceholderContent,
                    &path,
                    format!("Code block for {} contains placeholder content; provide the complete file", path),
                ));
            } else if block.significant_len() < self.min_code_block_chars {
                report.issues.push(ValidationIssue::at(
                    IssueKind::ContentTooShort,
                    &path,
                    format!(
                        "Code block for {} is too short ({} characters, minimum {})",
                        path,
                        block.significant_len(),
                        self.min_code_block_chars
                    ),
                ));
            }
        }
    }

    fn check_build_tools(&self, plan: &GeneratedPlan, report: &mut ValidationReport) {
        for task in plan.tasks.as_deref().unwrap_or(&[]) {
            let Some(command) = &task.command else { continue };
            let mentioned = BuildTool::mentioned_in(&task.description);
            let invoked = BuildTool::invoked_by(command);
            if mentioned.is_empty() || invoked.is_empty() {
                continue;
            }
            if !mentioned.iter().any(|tool| invoked.contains(tool)) {
                let names = |tools: &[BuildTool]| {
                    tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
                };
                report.issues.push(ValidationIssue::new(
                    IssueKind::BuildToolMismatch,
                    format!(
                        "Task {} says {} but its command `{}` runs {}",
                        task.id,
                        names(&mentioned),
                        command,
                        names(&invoked)
                    ),
                ));
            }
        }
    }

    fn check_existence(&self, plan: &GeneratedPlan, oracle: &dyn ExistenceOracle, report: &mut ValidationReport) {
        let Some(details) = &plan.plan else { return };
        for file in &details.files_to_create {
            let path = normalize_path(&file.path);
            if !path.is_empty() && oracle.exists(&path) {
                report.questions.push(format!(
                    "{} already exists. Should it be modified instead, or created under a different path?",
                    path
                ));
            }
        }
        for file in &details.files_to_modify {
            let path = normalize_path(&file.path);
            if !path.is_empty() && !has_traversal(&path) && !oracle.exists(&path) {
                report.questions.push(format!(
                    "{} does not exist. Should it be created, or is a different file meant?",
                    path
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extraction::extract_plan;
    use serde_json::json;

    const PAGE: &str = "export default function Page() { return <h1>Hello</h1>; }";

    fn plan(value: serde_json::Value) -> GeneratedPlan {
        GeneratedPlan::from_value(&value)
    }

    #[test]
    fn test_valid_plan_is_clean() {
        let p = plan(json!({
            "phase": "execution",
            "plan": {
                "actionType": "CREATE",
                "filesToCreate": [{"path": "app/hello/page.tsx"}],
                "executionOrder": ["create page"]
            },
            "codeBlocks": [{"filePath": "app/hello/page.tsx", "content": PAGE}]
        }));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.is_clean(), "{:?}", report);
    }

    #[test]
    fn test_missing_coverage_names_path() {
        let p = plan(json!({
            "plan": {"actionType": "CREATE", "filesToCreate": ["a.ts"], "executionOrder": ["x"]},
            "codeBlocks": []
        }));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.has_kind(IssueKind::MissingCoverage));
        assert!(report.issues.iter().any(|i| i.message.contains("a.ts")));
    }

    #[test]
    fn test_duplicate_and_uncovered_blocks() {
        let p = plan(json!({
            "plan": {"actionType": "CREATE", "filesToCreate": ["src/a.ts"], "executionOrder": ["x"]},
            "codeBlocks": [
                {"filePath": "src/a.ts", "content": PAGE},
                {"filePath": "./src/a.ts", "content": PAGE},
                {"filePath": "src/b.ts", "content": PAGE}
            ]
        }));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.has_kind(IssueKind::DuplicateCoverage));
        assert!(report.has_kind(IssueKind::UncoveredCodeBlock));
    }

    #[test]
    fn test_short_and_placeholder_content() {
        let p = plan(json!({
            "plan": {"actionType": "CREATE", "filesToCreate": ["src/a.ts", "src/b.ts"], "executionOrder": ["x"]},
            "codeBlocks": [
                {"filePath": "src/a.ts", "content": "x = 1"},
                {"filePath": "src/b.ts", "content": "export function b() {\n  // ... existing code\n}\n"}
            ]
        }));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.has_kind(IssueKind::ContentTooShort));
        assert!(report.has_kind(IssueKind::PlaceholderContent));
    }

    #[test]
    fn test_invalid_paths() {
        let p = plan(json!({
            "plan": {
                "actionType": "MODIFY",
                "filesToModify": ["src/*.ts", "../secrets.env", "a", ""],
                "executionOrder": ["x"]
            }
        }));
        let report = PlanValidator::default().validate(&p, None);
        let invalid = report.issues.iter().filter(|i| i.kind == IssueKind::InvalidPath).count();
        assert_eq!(invalid, 4);
    }

    #[test]
    fn test_missing_execution_order_and_packages() {
        let p = plan(json!({
            "plan": {"actionType": "ADD", "subTasks": [{"type": "install"}]}
        }));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.has_kind(IssueKind::MissingExecutionOrder));
        assert!(report.has_kind(IssueKind::MissingPackages));
    }

    #[test]
    fn test_build_tool_mismatch() {
        let p = plan(json!({
            "tasks": [
                {"type": "command", "description": "Install deps with yarn", "command": "npm install"},
                {"type": "command", "description": "Build with cargo", "command": "cargo build --release"}
            ]
        }));
        let report = PlanValidator::default().validate(&p, None);
        let mismatches: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::BuildToolMismatch)
            .collect();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].message.contains("yarn"));
    }

    #[test]
    fn test_oracle_questions() {
        let p = plan(json!({
            "plan": {
                "actionType": "CREATE",
                "filesToCreate": ["package.json"],
                "filesToModify": ["src/missing.ts"],
                "executionOrder": ["x"]
            },
            "codeBlocks": [
                {"filePath": "package.json", "content": "{\"name\": \"demo\", \"version\": \"1.0.0\"}"},
                {"filePath": "src/missing.ts", "content": PAGE}
            ]
        }));
        let existing: HashSet<String> = ["package.json".to_string()].into_iter().collect();
        let report = PlanValidator::default().validate(&p, Some(&existing));
        assert!(report.is_valid());
        assert_eq!(report.questions.len(), 2);
        assert!(report.questions[0].contains("package.json"));
        assert!(report.questions[1].contains("src/missing.ts"));
    }

    #[test]
    fn test_long_unstructured_response() {
        let validator = PlanValidator::default();
        let long = "words ".repeat(1000);
        let report = validator.validate_response(&long, &extract_plan(&long), None);
        assert!(report.has_kind(IssueKind::NotStructured));

        let short = "Sure, which framework are you using?";
        assert!(validator.validate_response(short, &extract_plan(short), None).is_clean());
    }

    #[test]
    fn test_clarifying_payload_only_carries_questions() {
        let p = plan(json!({"phase": "planning", "isClear": false, "questions": ["Which router?"]}));
        let report = PlanValidator::default().validate(&p, None);
        assert!(report.is_valid());
        assert_eq!(report.questions, vec!["Which router?".to_string()]);
    }
}
