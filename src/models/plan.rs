//! Generated Plan Models
//!
//! The structured payload a model embeds in its response, modeled as an
//! explicit record of optional fields. `GeneratedPlan::from_value` is lenient:
//! it reads whatever recognizable fields are present, accepts the common
//! spelling variants models produce, and never fails. Presence is preserved
//! (`None` vs empty) because the validator cares about the difference.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::workflow::{Stage, TaskResult};
use crate::utils::paths::normalize_path;

// ============================================================================
// Enums
// ============================================================================

/// Conversation phase the model claims to be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Planning,
    Execution,
}

impl Phase {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "planning" | "plan" | "analysis" => Some(Phase::Planning),
            "execution" | "execute" | "executing" | "implementation" => Some(Phase::Execution),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Planning => write!(f, "planning"),
            Phase::Execution => write!(f, "execution"),
        }
    }
}

/// Declared intent of the plan towards the file system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Create,
    Modify,
    Delete,
    Add,
    Replace,
}

impl ActionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CREATE" => Some(ActionType::Create),
            "MODIFY" | "UPDATE" | "EDIT" => Some(ActionType::Modify),
            "DELETE" | "REMOVE" => Some(ActionType::Delete),
            "ADD" => Some(ActionType::Add),
            "REPLACE" => Some(ActionType::Replace),
            _ => None,
        }
    }

    /// Whether this action writes files that should not exist yet
    pub fn creates(&self) -> bool {
        matches!(self, ActionType::Create | ActionType::Add)
    }
}

/// Kind of work a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Install,
    Create,
    Modify,
    Command,
    Info,
    FindFiles,
    AnalyzeSource,
    ModifySource,
    Compare,
    Verify,
    Apply,
}

impl TaskType {
    /// Parse a task type, accepting the aliases models commonly use.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        let task_type = match normalized.as_str() {
            "install" | "install_packages" | "install_dependencies" | "package" | "packages" => {
                TaskType::Install
            }
            "create" | "create_file" | "new_file" | "write" | "write_file" => TaskType::Create,
            "modify" | "modify_file" | "edit" | "update" | "change" => TaskType::Modify,
            "command" | "run" | "run_command" | "shell" | "exec" | "execute" => TaskType::Command,
            "info" | "note" | "explain" | "documentation" => TaskType::Info,
            "find_files" | "find" | "search" | "discover" => TaskType::FindFiles,
            "analyze_source" | "analyze" | "analysis" | "read" | "inspect" => {
                TaskType::AnalyzeSource
            }
            "modify_source" => TaskType::ModifySource,
            "compare" | "diff" => TaskType::Compare,
            "verify" | "test" | "validate" | "check" => TaskType::Verify,
            "apply" | "finalize" => TaskType::Apply,
            _ => return None,
        };
        Some(task_type)
    }

    /// Stage a task of this type runs in unless the plan says otherwise
    pub fn default_stage(&self) -> Stage {
        match self {
            TaskType::Install
            | TaskType::Create
            | TaskType::Modify
            | TaskType::Command
            | TaskType::ModifySource => Stage::Execution,
            TaskType::FindFiles => Stage::ResourceGathering,
            TaskType::AnalyzeSource | TaskType::Info => Stage::Analysis,
            TaskType::Compare => Stage::Design,
            TaskType::Verify => Stage::Validation,
            TaskType::Apply => Stage::Completion,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskType::Install => "install",
            TaskType::Create => "create",
            TaskType::Modify => "modify",
            TaskType::Command => "command",
            TaskType::Info => "info",
            TaskType::FindFiles => "find_files",
            TaskType::AnalyzeSource => "analyze_source",
            TaskType::ModifySource => "modify_source",
            TaskType::Compare => "compare",
            TaskType::Verify => "verify",
            TaskType::Apply => "apply",
        };
        write!(f, "{}", s)
    }
}

/// Task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

// ============================================================================
// Payload Records
// ============================================================================

/// A file the plan intends to create or modify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `purpose` for creates, `changes` for modifies
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "changes")]
    pub purpose: Option<String>,
    /// Model's belief about existence: yes, no, or unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<bool>,
}

impl PlannedFile {
    fn from_value(value: &Value) -> Option<Self> {
        if let Some(path) = value.as_str() {
            return Some(Self {
                path: path.to_string(),
                reason: None,
                purpose: None,
                file_exists: None,
            });
        }
        let path = str_field(value, &["path", "filePath", "file_path", "file"])?;
        Some(Self {
            path,
            reason: str_field(value, &["reason"]),
            purpose: str_field(value, &["purpose", "changes", "description"]),
            file_exists: bool_field(value, &["fileExists", "file_exists", "exists"]),
        })
    }
}

/// An entry of `plan.subTasks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The `plan` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    /// Package names, deduplicated in first-seen order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    #[serde(default)]
    pub files_to_create: Vec<PlannedFile>,
    #[serde(default)]
    pub files_to_modify: Vec<PlannedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Value>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

impl PlanDetails {
    fn from_value(value: &Value) -> Self {
        let packages = value.get("packages").map(|v| {
            let mut out: Vec<String> = Vec::new();
            for name in string_list(v) {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            out
        });

        let execution_order = value
            .get("executionOrder")
            .or_else(|| value.get("execution_order"))
            .map(|v| match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(_) => {
                            str_field(item, &["description", "step", "action", "task"])
                        }
                        _ => None,
                    })
                    .collect(),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            });

        let sub_tasks = value
            .get("subTasks")
            .or_else(|| value.get("sub_tasks"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => SubTask {
                            task_type: None,
                            target: None,
                            description: Some(s.clone()),
                        },
                        _ => SubTask {
                            task_type: str_field(item, &["type"])
                                .and_then(|t| TaskType::parse(&t)),
                            target: str_field(item, &["target", "package", "path"]),
                            description: str_field(item, &["description"]),
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            action_type: str_field(value, &["actionType", "action_type", "action"])
                .and_then(|s| ActionType::parse(&s)),
            packages,
            files_to_create: planned_files(value, &["filesToCreate", "files_to_create"]),
            files_to_modify: planned_files(value, &["filesToModify", "files_to_modify"]),
            execution_order,
            architecture: value.get("architecture").cloned(),
            sub_tasks,
        }
    }

    /// Every planned path, creates first, normalized
    pub fn planned_paths(&self) -> Vec<String> {
        self.files_to_create
            .iter()
            .chain(self.files_to_modify.iter())
            .map(|f| normalize_path(&f.path))
            .collect()
    }
}

/// One executable unit of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Declared dependencies; `None` means "use the default chain"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}

impl Task {
    pub fn new(id: impl Into<String>, task_type: TaskType, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type,
            description: description.into(),
            target: None,
            content: None,
            command: None,
            dependencies: None,
            stage: None,
            status: TaskStatus::Pending,
            result: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a task at 0-based `index`. Returns `None` for non-objects.
    fn from_value(value: &Value, index: usize) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let id = match value.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => format!("task-{}", n),
            _ => format!("task-{}", index + 1),
        };

        let raw_type = str_field(value, &["type", "taskType", "task_type", "action"]);
        let task_type = match raw_type.as_deref().map(TaskType::parse) {
            Some(Some(t)) => t,
            Some(None) => {
                warn!(task_id = %id, raw_type = ?raw_type, "Unknown task type, treating as info");
                TaskType::Info
            }
            None => TaskType::Info,
        };

        let dependencies = value
            .get("dependencies")
            .or_else(|| value.get("dependsOn"))
            .or_else(|| value.get("depends_on"))
            .map(|v| match v {
                Value::Array(items) => items.iter().filter_map(dependency_id).collect(),
                other => dependency_id(other).into_iter().collect(),
            });

        Some(Self {
            id,
            task_type,
            description: str_field(value, &["description", "title", "name"]).unwrap_or_default(),
            target: str_field(value, &["target", "path", "filePath", "file"]),
            content: str_field(value, &["content", "code"]),
            command: str_field(value, &["command", "cmd"]),
            dependencies,
            stage: None,
            status: TaskStatus::Pending,
            result: None,
        })
    }
}

/// A fenced or structured block of file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub content: String,
}

impl CodeBlock {
    fn from_value(value: &Value) -> Option<Self> {
        let file_path = str_field(value, &["filePath", "file_path", "path", "file", "filename"])?;
        Some(Self {
            file_path,
            language: str_field(value, &["language", "lang"]),
            content: str_field(value, &["content", "code"]).unwrap_or_default(),
        })
    }

    /// Length of the content ignoring whitespace
    pub fn significant_len(&self) -> usize {
        self.content.chars().filter(|c| !c.is_whitespace()).count()
    }
}

// ============================================================================
// Generated Plan
// ============================================================================

/// The structured payload recovered from a model response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_clear: Option<bool>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_execute: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlock>,
}

impl GeneratedPlan {
    /// Whether a parsed value looks like a plan payload at all
    pub fn has_marker(value: &Value) -> bool {
        value.is_object()
            && (value.get("phase").is_some()
                || value.get("plan").is_some()
                || value.get("tasks").is_some())
    }

    /// Read a plan from a parsed JSON value
    pub fn from_value(value: &Value) -> Self {
        let questions = value
            .get("questions")
            .map(|v| match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|q| match q {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(_) => str_field(q, &["question", "text"]),
                        _ => None,
                    })
                    .filter(|q| !q.trim().is_empty())
                    .collect(),
                Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
                _ => Vec::new(),
            })
            .unwrap_or_default();

        let tasks = value.get("tasks").and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| Task::from_value(item, i))
                .collect()
        });

        let code_blocks = value
            .get("codeBlocks")
            .or_else(|| value.get("code_blocks"))
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(CodeBlock::from_value).collect())
            .unwrap_or_default();

        Self {
            phase: str_field(value, &["phase"]).and_then(|p| Phase::parse(&p)),
            analysis: str_field(value, &["analysis"]),
            is_clear: bool_field(value, &["isClear", "is_clear"]),
            questions,
            plan: value
                .get("plan")
                .filter(|p| p.is_object())
                .map(PlanDetails::from_value),
            ready_to_execute: bool_field(value, &["readyToExecute", "ready_to_execute"]),
            tasks,
            code_blocks,
        }
    }

    /// Whether the model says it still needs answers
    pub fn needs_clarification(&self) -> bool {
        self.is_clear == Some(false) || !self.questions.is_empty()
    }

    pub fn packages(&self) -> &[String] {
        self.plan
            .as_ref()
            .and_then(|p| p.packages.as_deref())
            .unwrap_or(&[])
    }

    pub fn planned_paths(&self) -> Vec<String> {
        self.plan
            .as_ref()
            .map(|p| p.planned_paths())
            .unwrap_or_default()
    }

    /// Code block whose normalized path equals the normalized `path`
    pub fn code_block_for(&self, path: &str) -> Option<&CodeBlock> {
        let wanted = normalize_path(path);
        self.code_blocks
            .iter()
            .find(|b| normalize_path(&b.file_path) == wanted)
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.plan.as_ref().and_then(|p| p.action_type)
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => str_field(v, &["name", "package"]),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn planned_files(value: &Value, keys: &[&str]) -> Vec<PlannedFile> {
    keys.iter()
        .find_map(|k| value.get(*k))
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(PlannedFile::from_value).collect())
        .unwrap_or_default()
}

/// Numbers are 1-based task positions; strings are ids
fn dependency_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(format!("task-{}", n)),
        Value::String(s) if s.trim().chars().all(|c| c.is_ascii_digit()) && !s.trim().is_empty() => {
            Some(format!("task-{}", s.trim()))
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_payload() {
        let value = json!({
            "phase": "execution",
            "analysis": "Add a hello page",
            "isClear": true,
            "plan": {
                "actionType": "CREATE",
                "packages": ["react", "react"],
                "filesToCreate": [{"path": "app/hello/page.tsx", "purpose": "page", "fileExists": false}],
                "filesToModify": [{"path": "app/layout.tsx", "changes": "add nav"}],
                "executionOrder": ["create page", {"step": "update layout"}]
            },
            "tasks": [
                {"type": "create", "description": "Create page", "target": "app/hello/page.tsx"},
                {"type": "run", "description": "Build", "command": "npm run build", "dependencies": [1]}
            ],
            "codeBlocks": [{"filePath": "app/hello/page.tsx", "language": "tsx", "content": "export default 1"}]
        });

        let plan = GeneratedPlan::from_value(&value);
        assert_eq!(plan.phase, Some(Phase::Execution));
        assert_eq!(plan.action_type(), Some(ActionType::Create));
        assert_eq!(plan.packages(), &["react".to_string()]);

        let details = plan.plan.as_ref().unwrap();
        assert_eq!(details.files_to_modify[0].purpose.as_deref(), Some("add nav"));
        assert_eq!(details.files_to_create[0].file_exists, Some(false));
        assert_eq!(
            details.execution_order.as_ref().unwrap(),
            &vec!["create page".to_string(), "update layout".to_string()]
        );

        let tasks = plan.tasks.as_ref().unwrap();
        assert_eq!(tasks[0].id, "task-1");
        assert_eq!(tasks[1].task_type, TaskType::Command);
        assert_eq!(tasks[1].dependencies, Some(vec!["task-1".to_string()]));
        assert!(plan.code_block_for("./app/hello/page.tsx").is_some());
    }

    #[test]
    fn test_from_value_is_deterministic() {
        let value = json!({"phase": "planning", "plan": {}, "questions": ["Which router?"]});
        assert_eq!(GeneratedPlan::from_value(&value), GeneratedPlan::from_value(&value));
        assert!(GeneratedPlan::from_value(&value).needs_clarification());
    }

    #[test]
    fn test_string_planned_files() {
        let value = json!({"plan": {"filesToCreate": ["a.ts"]}});
        let plan = GeneratedPlan::from_value(&value);
        assert_eq!(plan.planned_paths(), vec!["a.ts".to_string()]);
    }

    #[test]
    fn test_unknown_task_type_is_info() {
        let value = json!({"tasks": [{"type": "celebrate", "description": "party"}]});
        let plan = GeneratedPlan::from_value(&value);
        assert_eq!(plan.tasks.unwrap()[0].task_type, TaskType::Info);
    }

    #[test]
    fn test_has_marker() {
        assert!(GeneratedPlan::has_marker(&json!({"tasks": []})));
        assert!(!GeneratedPlan::has_marker(&json!({"name": "x"})));
        assert!(!GeneratedPlan::has_marker(&json!([1, 2])));
    }

    #[test]
    fn test_task_type_aliases_and_stages() {
        assert_eq!(TaskType::parse("Install-Packages"), Some(TaskType::Install));
        assert_eq!(TaskType::parse("find files"), Some(TaskType::FindFiles));
        assert_eq!(TaskType::FindFiles.default_stage(), Stage::ResourceGathering);
        assert_eq!(TaskType::Verify.default_stage(), Stage::Validation);
        assert_eq!(TaskType::Compare.default_stage(), Stage::Design);
    }

    #[test]
    fn test_serialization_round_trip_keeps_type_field() {
        let task = Task::new("t1", TaskType::Install, "deps").with_target("zod");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "install");
        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }
}
