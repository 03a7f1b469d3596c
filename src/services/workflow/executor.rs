//! Task Executor
//!
//! Runs compiled tasks one at a time against the file and command
//! collaborators. A task never fails past this boundary: every problem ends up
//! in its `TaskResult`, and anything a person or the model has to decide is
//! raised as a `ClarificationRequest` instead of being guessed.
//!
//! `run_workflow` drives a whole `WorkflowContext`: tasks run in compiled
//! order with a short pause between them, a task whose dependency did not
//! complete is skipped, and cancellation is honored between tasks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use plan_pilot_core::{CommandCollaborator, FileCollaborator};
use plan_pilot_project::{BuildTool, ProjectDetector};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::templates::default_template;
use crate::models::plan::{ActionType, Task, TaskStatus, TaskType};
use crate::models::settings::PilotConfig;
use crate::models::workflow::{
    ClarificationRequest, FailureContext, SourceFile, Stage, TaskResult, WorkflowContext,
};
use crate::services::inference::BestEffortInference;
use crate::utils::paths::normalize_path;

/// Characters kept in previews and content excerpts
const EXCERPT_CHARS: usize = 600;

// ============================================================================
// Events and Summary
// ============================================================================

/// Progress events emitted while a workflow runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Task execution started
    TaskStarted {
        task_id: String,
        task_type: TaskType,
        stage: Option<Stage>,
    },
    /// Task finished successfully
    TaskCompleted { task_id: String, message: String },
    /// Task finished unsuccessfully
    TaskFailed {
        task_id: String,
        message: String,
        clarifications: usize,
    },
    /// Task skipped because a dependency did not complete
    TaskSkipped { task_id: String, reason: String },
    /// Cancellation observed; remaining tasks left pending
    Cancelled { remaining: usize },
    /// Every task reached a terminal state
    Finished {
        completed: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Counts and clarifications after a workflow run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub clarifications: Vec<ClarificationRequest>,
}

impl WorkflowSummary {
    pub fn success(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.skipped == 0
    }

    fn from_context(ctx: &WorkflowContext, cancelled: bool) -> Self {
        Self {
            completed: ctx.count_with_status(TaskStatus::Completed),
            failed: ctx.count_with_status(TaskStatus::Failed),
            skipped: ctx.count_with_status(TaskStatus::Skipped),
            cancelled,
            clarifications: ctx.clarifications(),
        }
    }
}

/// Outcome of writing one file of a create/modify task
enum FileOutcome {
    Written,
    Refused(ClarificationRequest),
}

/// Whether a write task expects its targets to be new or existing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Modify,
    /// No declared action: create missing files, modify existing ones
    Either,
}

impl WriteMode {
    /// `modify_source` follows the plan's declared action type
    fn for_task(task_type: TaskType, action: Option<ActionType>) -> Self {
        match task_type {
            TaskType::Create => WriteMode::Create,
            TaskType::ModifySource => match action {
                Some(action) if action.creates() => WriteMode::Create,
                Some(_) => WriteMode::Modify,
                None => WriteMode::Either,
            },
            _ => WriteMode::Modify,
        }
    }

    fn creates(self, exists: bool) -> bool {
        match self {
            WriteMode::Create => true,
            WriteMode::Modify => false,
            WriteMode::Either => !exists,
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Executes tasks against a project root
pub struct TaskExecutor {
    files: Arc<dyn FileCollaborator>,
    commands: Arc<dyn CommandCollaborator>,
    inference: Arc<dyn BestEffortInference>,
    project_root: PathBuf,
    config: PilotConfig,
}

impl TaskExecutor {
    pub fn new(
        files: Arc<dyn FileCollaborator>,
        commands: Arc<dyn CommandCollaborator>,
        inference: Arc<dyn BestEffortInference>,
        project_root: impl Into<PathBuf>,
        config: PilotConfig,
    ) -> Self {
        Self {
            files,
            commands,
            inference,
            project_root: project_root.into(),
            config,
        }
    }

    pub fn project_root(&self) -> &PathBuf {
        &self.project_root
    }

    /// Run every pending task of `ctx` in order.
    pub async fn run_workflow(
        &self,
        ctx: &mut WorkflowContext,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> WorkflowSummary {
        info!(workflow_id = %ctx.id, tasks = ctx.tasks.len(), "Starting workflow");
        let delay = Duration::from_millis(self.config.task_delay_ms);
        let mut ran_any = false;

        for index in 0..ctx.tasks.len() {
            if ctx.tasks[index].status.is_terminal() {
                continue;
            }
            if cancel.is_cancelled() {
                let remaining = ctx.tasks.len() - index;
                info!(workflow_id = %ctx.id, remaining = remaining, "Workflow cancelled");
                emit(events, WorkflowEvent::Cancelled { remaining }).await;
                return WorkflowSummary::from_context(ctx, true);
            }

            let task = ctx.tasks[index].clone();
            let blocker = task
                .dependencies
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .find(|dep| ctx.status_of(dep) != Some(TaskStatus::Completed))
                .cloned();
            if let Some(dep) = blocker {
                let reason = format!("Dependency {} did not complete", dep);
                debug!(task_id = %task.id, dependency = %dep, "Skipping task");
                let result = TaskResult::fail(format!("Skipped: {}", reason));
                self.finish(ctx, index, TaskStatus::Skipped, result);
                emit(
                    events,
                    WorkflowEvent::TaskSkipped {
                        task_id: task.id.clone(),
                        reason,
                    },
                )
                .await;
                continue;
            }

            if ran_any && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            ran_any = true;

            ctx.tasks[index].status = TaskStatus::Running;
            emit(
                events,
                WorkflowEvent::TaskStarted {
                    task_id: task.id.clone(),
                    task_type: task.task_type,
                    stage: task.stage,
                },
            )
            .await;

            let result = self.execute_task(&task, ctx).await;
            let event = if result.success {
                WorkflowEvent::TaskCompleted {
                    task_id: task.id.clone(),
                    message: result.message.clone(),
                }
            } else {
                WorkflowEvent::TaskFailed {
                    task_id: task.id.clone(),
                    message: result.message.clone(),
                    clarifications: result.clarifications.len(),
                }
            };
            let status = if result.success {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
            self.finish(ctx, index, status, result);
            emit(events, event).await;
        }

        let summary = WorkflowSummary::from_context(ctx, false);
        info!(
            workflow_id = %ctx.id,
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Workflow finished"
        );
        emit(
            events,
            WorkflowEvent::Finished {
                completed: summary.completed,
                failed: summary.failed,
                skipped: summary.skipped,
            },
        )
        .await;
        summary
    }

    fn finish(&self, ctx: &mut WorkflowContext, index: usize, status: TaskStatus, result: TaskResult) {
        let task = &mut ctx.tasks[index];
        task.status = status;
        task.result = Some(result.clone());
        ctx.results.insert(task.id.clone(), result);
    }

    /// Execute exactly one task. Never fails; problems are in the result.
    pub async fn execute_task(&self, task: &Task, ctx: &mut WorkflowContext) -> TaskResult {
        debug!(task_id = %task.id, task_type = %task.task_type, "Executing task");
        match task.task_type {
            TaskType::Install => self.run_install(task, ctx).await,
            TaskType::FindFiles => self.run_find_files(task, ctx).await,
            TaskType::AnalyzeSource => self.run_analyze_source(ctx).await,
            TaskType::Create | TaskType::Modify | TaskType::ModifySource => {
                let mode = WriteMode::for_task(task.task_type, ctx.plan.action_type());
                self.run_write(task, ctx, mode).await
            }
            TaskType::Command => self.run_command_task(task).await,
            TaskType::Info => TaskResult::ok(non_empty(&task.description, "Noted")),
            TaskType::Compare => TaskResult::ok("Comparison recorded"),
            TaskType::Verify => TaskResult::ok("Verification recorded"),
            TaskType::Apply => TaskResult::ok("Changes applied"),
        }
    }

    // ========================================================================
    // install
    // ========================================================================

    /// First non-empty source wins: plan packages, install sub-task targets,
    /// the task's own target or command, then a scan of the raw response.
    fn resolve_packages(&self, task: &Task, ctx: &WorkflowContext) -> Vec<String> {
        let from_plan = clean_package_names(ctx.plan.packages().to_vec());
        if !from_plan.is_empty() {
            return from_plan;
        }

        let from_sub_tasks = clean_package_names(
            ctx.plan
                .plan
                .iter()
                .flat_map(|p| p.sub_tasks.iter())
                .filter(|s| s.task_type == Some(TaskType::Install))
                .filter_map(|s| s.target.as_deref())
                .flat_map(split_names)
                .collect(),
        );
        if !from_sub_tasks.is_empty() {
            return from_sub_tasks;
        }

        let mut own: Vec<String> = task.target.as_deref().map(split_names).unwrap_or_default();
        if let Some(command) = &task.command {
            own.extend(self.inference.infer_packages(command));
        }
        let own = clean_package_names(own);
        if !own.is_empty() {
            return own;
        }

        clean_package_names(self.inference.infer_packages(&ctx.raw_response))
    }

    async fn run_install(&self, task: &Task, ctx: &WorkflowContext) -> TaskResult {
        let packages = self.resolve_packages(task, ctx);
        if packages.is_empty() {
            if let Some(command) = &task.command {
                return self.run_command(command, task).await;
            }
            return TaskResult::fail("No packages to install").with_clarification(needs_input(
                task,
                "No packages could be determined for this install step. Name the packages to install or drop the step.",
                vec!["List the packages in plan.packages".to_string(), "Skip this install".to_string()],
            ));
        }

        let tool = ProjectDetector::new(&self.project_root)
            .detect()
            .ok()
            .and_then(|detected| detected.build_tool)
            .unwrap_or(BuildTool::Npm);
        let command = tool.install_command(&packages);
        info!(task_id = %task.id, package_manager = %tool, packages = ?packages, "Installing packages");

        let mut result = self.run_command(&command, task).await;
        if result.success {
            result.message = format!("Installed {}", packages.join(", "));
        }
        let mut data = result.data.take().unwrap_or_else(|| json!({}));
        data["packages"] = json!(packages);
        data["packageManager"] = json!(tool.name());
        result.with_data(data)
    }

    // ========================================================================
    // find_files / analyze_source
    // ========================================================================

    async fn run_find_files(&self, task: &Task, ctx: &mut WorkflowContext) -> TaskResult {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(target) = &task.target {
            candidates.extend(self.inference.infer_paths(target));
        }
        candidates.extend(ctx.plan.planned_paths());
        candidates.extend(ctx.plan.code_blocks.iter().map(|b| normalize_path(&b.file_path)));
        candidates.extend(ctx.context_files.iter().map(|f| normalize_path(f)));

        let mut found: Vec<String> = Vec::new();
        for path in candidates {
            if found.len() >= self.config.max_found_files {
                break;
            }
            if path.is_empty() || found.contains(&path) {
                continue;
            }
            if self.files.exists(&path, &self.project_root).await {
                found.push(path);
            }
        }

        debug!(task_id = %task.id, found = found.len(), "Located files");
        let message = if found.is_empty() {
            "No existing files found".to_string()
        } else {
            format!("Found {} file(s)", found.len())
        };
        ctx.found_files = found.clone();
        TaskResult::ok(message).with_data(json!({ "files": found }))
    }

    async fn run_analyze_source(&self, ctx: &mut WorkflowContext) -> TaskResult {
        let paths: Vec<String> = if ctx.found_files.is_empty() {
            ctx.plan.planned_paths()
        } else {
            ctx.found_files.clone()
        };

        let mut analyzed = Vec::new();
        let mut skipped = Vec::new();
        for path in paths.into_iter().take(self.config.max_analyzed_files) {
            match self.files.read_file(&path, &self.project_root).await {
                Ok(content) => {
                    analyzed.push(path.clone());
                    ctx.sources.retain(|s| s.path != path);
                    ctx.sources.push(SourceFile { path, content });
                }
                Err(e) => {
                    debug!(path = %path, error = %e, "Skipping unreadable source");
                    skipped.push(path);
                }
            }
        }

        TaskResult::ok(format!("Analyzed {} source file(s)", analyzed.len()))
            .with_data(json!({ "analyzed": analyzed, "skipped": skipped }))
    }

    // ========================================================================
    // create / modify
    // ========================================================================

    fn write_targets(&self, task: &Task, ctx: &WorkflowContext, mode: WriteMode) -> Vec<String> {
        let mut targets: Vec<String> = task
            .target
            .as_deref()
            .map(|t| {
                t.split(',')
                    .map(normalize_path)
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if targets.is_empty() {
            if let Some(details) = &ctx.plan.plan {
                let files = match mode {
                    WriteMode::Create => details.files_to_create.iter().collect::<Vec<_>>(),
                    WriteMode::Modify => details.files_to_modify.iter().collect(),
                    WriteMode::Either => details
                        .files_to_modify
                        .iter()
                        .chain(details.files_to_create.iter())
                        .collect(),
                };
                targets = files.iter().map(|f| normalize_path(&f.path)).collect();
            }
        }
        if targets.is_empty() {
            targets = self.inference.infer_paths(&task.description);
        }

        let mut unique = Vec::new();
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        unique
    }

    /// Content for `path`: code block, task content, embedded block, template
    fn resolve_content(&self, path: &str, task: &Task, ctx: &WorkflowContext, single: bool, create: bool) -> Option<String> {
        if let Some(block) = ctx.plan.code_block_for(path) {
            return Some(block.content.clone());
        }
        if single {
            if let Some(content) = task.content.as_ref().filter(|c| !c.trim().is_empty()) {
                return Some(content.clone());
            }
        }
        if let Some(content) = self.inference.find_embedded_block(&ctx.raw_response, path) {
            return Some(content);
        }
        if create {
            return default_template(path);
        }
        None
    }

    async fn run_write(&self, task: &Task, ctx: &WorkflowContext, mode: WriteMode) -> TaskResult {
        let targets = self.write_targets(task, ctx, mode);
        if targets.is_empty() {
            return TaskResult::fail(format!("No target file for task {}", task.id)).with_clarification(
                needs_input(
                    task,
                    "No target file could be determined for this step. Name the file to write.",
                    vec!["Set the task target to a project-relative path".to_string()],
                ),
            );
        }

        let single = targets.len() == 1;
        let mut written: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();
        let mut clarifications = Vec::new();

        for path in &targets {
            match self.write_one(path, task, ctx, single, mode).await {
                FileOutcome::Written => written.push(path.clone()),
                FileOutcome::Refused(request) => {
                    failed.push(path.clone());
                    clarifications.push(request);
                }
            }
        }

        let verb = match mode {
            WriteMode::Create => "Created",
            WriteMode::Modify => "Modified",
            WriteMode::Either => "Wrote",
        };
        let partial = !written.is_empty() && !failed.is_empty();
        let message = match (written.is_empty(), failed.is_empty()) {
            (false, true) => format!("{} {}", verb, written.join(", ")),
            (false, false) => format!(
                "{} {}; {} file(s) need attention: {}",
                verb,
                written.join(", "),
                failed.len(),
                failed.join(", ")
            ),
            _ => format!("No files written; {} need attention: {}", failed.len(), failed.join(", ")),
        };

        let mut result = if written.is_empty() {
            TaskResult::fail(message)
        } else {
            TaskResult::ok(message)
        }
        .with_data(json!({ "written": written, "failed": failed, "partial": partial }));
        result.clarifications = clarifications;
        result
    }

    async fn write_one(&self, path: &str, task: &Task, ctx: &WorkflowContext, single: bool, mode: WriteMode) -> FileOutcome {
        let exists = self.files.exists(path, &self.project_root).await;
        let create = mode.creates(exists);
        let content = self.resolve_content(path, task, ctx, single, create);

        if create && exists {
            warn!(path = %path, "Create target already exists");
            let preview = self
                .files
                .read_file(path, &self.project_root)
                .await
                .ok()
                .map(|c| excerpt(&c));
            return FileOutcome::Refused(ClarificationRequest {
                target_path: path.to_string(),
                prompt_text: format!(
                    "{} already exists. Creating it would overwrite the current content. Should it be modified instead, written to a different path, or skipped?",
                    path
                ),
                original_request: task.description.clone(),
                failure_context: None,
                file_exists: Some(true),
                preview,
                alternatives: vec![
                    format!("Modify {} instead of creating it", path),
                    format!("Create {} instead", alternative_path(path)),
                    format!("Skip {}", path),
                ],
            });
        }

        if !create && !exists {
            warn!(path = %path, "Modify target does not exist");
            return FileOutcome::Refused(ClarificationRequest {
                target_path: path.to_string(),
                prompt_text: format!(
                    "{} does not exist, so it cannot be modified. Should it be created, or is a different file meant?",
                    path
                ),
                original_request: task.description.clone(),
                failure_context: None,
                file_exists: Some(false),
                preview: content.as_deref().map(excerpt),
                alternatives: vec![
                    format!("Create {} as a new file", path),
                    "Name the existing file that should be modified".to_string(),
                    format!("Skip {}", path),
                ],
            });
        }

        let Some(content) = content else {
            return FileOutcome::Refused(ClarificationRequest {
                target_path: path.to_string(),
                prompt_text: format!("No content was provided for {}. Provide the complete file.", path),
                original_request: task.description.clone(),
                failure_context: None,
                file_exists: Some(exists),
                preview: None,
                alternatives: vec![format!("Provide a code block for {}", path)],
            });
        };

        match self.files.write_file(path, &self.project_root, &content).await {
            Ok(()) => {
                info!(task_id = %task.id, path = %path, create = create, "Wrote file");
                FileOutcome::Written
            }
            Err(failure) => {
                warn!(path = %path, error = %failure, "Write refused");
                FileOutcome::Refused(ClarificationRequest {
                    target_path: path.to_string(),
                    prompt_text: format!(
                        "Writing {} failed: {}. Choose how to proceed.",
                        path, failure.message
                    ),
                    original_request: task.description.clone(),
                    alternatives: failure.suggestions.clone(),
                    failure_context: Some(FailureContext {
                        operation: "write_file".to_string(),
                        error_message: failure.message,
                        error_type: failure.error_type,
                        suggestions: failure.suggestions,
                        attempted_content_excerpt: Some(excerpt(&content)),
                    }),
                    file_exists: Some(exists),
                    preview: None,
                })
            }
        }
    }

    // ========================================================================
    // command
    // ========================================================================

    async fn run_command_task(&self, task: &Task) -> TaskResult {
        let command = task
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.inference.infer_command(&task.description));
        match command {
            Some(command) => self.run_command(&command, task).await,
            None => TaskResult::fail(format!("No command given or inferable for task {}", task.id))
                .with_clarification(needs_input(
                    task,
                    "No command was given for this step and none could be inferred. Provide the exact command.",
                    vec!["Set the task command".to_string(), "Skip this command".to_string()],
                )),
        }
    }

    async fn run_command(&self, command: &str, task: &Task) -> TaskResult {
        match self.commands.run(command, &self.project_root).await {
            Ok(output) => {
                let data = json!({
                    "command": command,
                    "exitCode": output.exit_code,
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                });
                if output.success() {
                    TaskResult::ok(format!("`{}` succeeded", command)).with_data(data)
                } else {
                    let detail = if output.stderr.trim().is_empty() {
                        output.stdout.trim()
                    } else {
                        output.stderr.trim()
                    };
                    warn!(task_id = %task.id, command = %command, exit_code = output.exit_code, "Command failed");
                    let message = format!("`{}` exited with code {}: {}", command, output.exit_code, excerpt(detail));
                    TaskResult::fail(message.clone())
                        .with_data(data)
                        .with_clarification(ClarificationRequest {
                            target_path: self.project_root.to_string_lossy().into_owned(),
                            prompt_text: format!("{}. Fix the cause or change the command.", message),
                            original_request: task.description.clone(),
                            failure_context: Some(FailureContext {
                                operation: "run_command".to_string(),
                                error_message: excerpt(detail),
                                error_type: "exit_status".to_string(),
                                suggestions: vec![
                                    "Add the missing file, script or dependency the command needs".to_string(),
                                ],
                                attempted_content_excerpt: Some(command.to_string()),
                            }),
                            file_exists: None,
                            preview: None,
                            alternatives: vec!["Change the command".to_string(), "Skip this command".to_string()],
                        })
                }
            }
            Err(e) => {
                warn!(task_id = %task.id, command = %command, error = %e, "Command could not run");
                TaskResult::fail(format!("`{}` could not be run: {}", command, e))
                    .with_data(json!({ "command": command }))
                    .with_clarification(ClarificationRequest {
                        target_path: self.project_root.to_string_lossy().into_owned(),
                        prompt_text: format!(
                            "The command `{}` could not be run: {}. Provide a different command or skip this step.",
                            command, e
                        ),
                        original_request: task.description.clone(),
                        failure_context: Some(FailureContext {
                            operation: "run_command".to_string(),
                            error_message: e.to_string(),
                            error_type: "command_unavailable".to_string(),
                            suggestions: vec![
                                "Check that the program is installed and on PATH".to_string(),
                            ],
                            attempted_content_excerpt: Some(command.to_string()),
                        }),
                        file_exists: None,
                        preview: None,
                        alternatives: vec!["Skip this command".to_string()],
                    })
            }
        }
    }
}

async fn emit(events: Option<&mpsc::Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

/// Trimmed, deduplicated, without "undefined" or flags
fn clean_package_names(names: Vec<String>) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("undefined") || name.starts_with('-') {
            continue;
        }
        if !packages.iter().any(|p| p == name) {
            packages.push(name.to_string());
        }
    }
    packages
}

fn split_names(s: &str) -> Vec<String> {
    s.split([',', ' '])
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect()
}

fn non_empty(s: &str, fallback: &str) -> String {
    if s.trim().is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

fn excerpt(s: &str) -> String {
    if s.chars().count() <= EXCERPT_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(EXCERPT_CHARS).collect();
    out.push_str("\n...");
    out
}

/// Request for a task that cannot proceed without more information
fn needs_input(task: &Task, prompt: &str, alternatives: Vec<String>) -> ClarificationRequest {
    ClarificationRequest {
        target_path: task.target.clone().unwrap_or_else(|| task.id.clone()),
        prompt_text: prompt.to_string(),
        original_request: task.description.clone(),
        failure_context: None,
        file_exists: None,
        preview: None,
        alternatives,
    }
}

/// "app/page.tsx" -> "app/page.new.tsx"
fn alternative_path(path: &str) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let name = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!("{}.new.{}", stem, ext),
        _ => format!("{}.new", name),
    };
    match dir {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    }
}
