//! Workflow Integration Tests
//!
//! Compilation order, dependency skipping, conflicts and write failures.

use std::fs;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use plan_pilot::models::plan::{TaskStatus, TaskType};
use plan_pilot::models::workflow::WorkflowContext;
use plan_pilot::services::extraction::extract_plan;
use plan_pilot::services::workflow::WorkflowEvent;

use super::support::{compiler, executor, CountingFiles, ScriptedCommands};

#[tokio::test]
async fn test_failed_dependency_skips_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"```json
{"phase": "execution", "tasks": [
  {"id": "A", "type": "command", "description": "run the generator", "command": "make gen"},
  {"id": "B", "type": "info", "description": "report", "dependencies": ["A"]},
  {"id": "C", "type": "info", "description": "summarize", "dependencies": ["B"]}
]}
```"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let mut ctx = compiler().compile(&plan, text).unwrap();

    let commands = Arc::new(ScriptedCommands::default().with_exit("make gen", 2));
    let runner = executor(Arc::new(CountingFiles::default()), commands.clone(), dir.path());
    let (tx, mut rx) = mpsc::channel(32);
    let summary = runner
        .run_workflow(&mut ctx, &CancellationToken::new(), Some(&tx))
        .await;
    drop(tx);

    assert_eq!(ctx.status_of("A"), Some(TaskStatus::Failed));
    assert_eq!(ctx.status_of("B"), Some(TaskStatus::Skipped));
    assert_eq!(ctx.status_of("C"), Some(TaskStatus::Skipped));
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert!(!summary.success());
    assert_eq!(commands.ran().await, vec!["make gen".to_string()]);

    let mut skipped = Vec::new();
    while let Some(event) = rx.recv().await {
        if let WorkflowEvent::TaskSkipped { task_id, .. } = event {
            skipped.push(task_id);
        }
    }
    assert_eq!(skipped, vec!["B".to_string(), "C".to_string()]);
}

#[test]
fn test_execution_order_steps_are_typed_and_staged() {
    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "ADD", "packages": ["zod"],
  "executionOrder": ["install zod", "create src/schema.ts", "review the existing forms"]}}
```"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let tasks = compiler().compile_tasks(&plan).unwrap();
    let types: Vec<_> = tasks.iter().map(|t| t.task_type).collect();
    assert_eq!(
        types,
        vec![TaskType::AnalyzeSource, TaskType::Install, TaskType::Create]
    );
    assert_eq!(tasks[2].target.as_deref(), Some("src/schema.ts"));
    assert_eq!(tasks[2].dependencies, Some(vec![tasks[1].id.clone()]));
}

#[test]
fn test_cycle_is_a_compile_error() {
    let text = r#"{"phase": "execution", "tasks": [
  {"id": "a", "type": "info", "description": "a", "dependencies": ["b"]},
  {"id": "b", "type": "info", "description": "b", "dependencies": ["a"]}
]}"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let error = compiler().compile_tasks(&plan).unwrap_err();
    assert!(error.to_string().contains("Circular dependency"));
}

#[tokio::test]
async fn test_create_on_existing_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/config.ts"), "export const port = 3000;\n").unwrap();

    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "CREATE",
  "filesToCreate": [{"path": "src/config.ts"}], "executionOrder": ["create src/config.ts"]},
 "codeBlocks": [{"filePath": "src/config.ts", "content": "export const port = 8080;\n"}]}
```"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let mut ctx = compiler().compile(&plan, text).unwrap();

    let files = Arc::new(CountingFiles::default());
    let runner = executor(files.clone(), Arc::new(ScriptedCommands::default()), dir.path());
    let summary = runner.run_workflow(&mut ctx, &CancellationToken::new(), None).await;

    assert_eq!(files.writes(), 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/config.ts")).unwrap(),
        "export const port = 3000;\n"
    );
    assert_eq!(summary.clarifications.len(), 1);
    let request = &summary.clarifications[0];
    assert_eq!(request.target_path, "src/config.ts");
    assert_eq!(request.file_exists, Some(true));
    assert!(request.preview.as_deref().unwrap().contains("3000"));
    assert!(!request.alternatives.is_empty());
}

#[tokio::test]
async fn test_write_failure_carries_failure_context() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"{"phase": "execution", "tasks": [
  {"id": "bad", "type": "create", "description": "escape", "target": "../escape.ts", "content": "export const escaped = true;"}
]}"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let mut ctx = compiler().compile(&plan, text).unwrap();

    let runner = executor(
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
        dir.path(),
    );
    let summary = runner.run_workflow(&mut ctx, &CancellationToken::new(), None).await;

    assert_eq!(summary.failed, 1);
    let request = &summary.clarifications[0];
    let failure = request.failure_context.as_ref().unwrap();
    assert_eq!(failure.operation, "write_file");
    assert_eq!(failure.error_type, "invalid_path");
}

#[tokio::test]
async fn test_cancellation_between_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"{"phase": "execution", "tasks": [
  {"id": "one", "type": "info", "description": "one"},
  {"id": "two", "type": "info", "description": "two"}
]}"#;
    let plan = extract_plan(text).into_plan().unwrap();
    let tasks = compiler().compile_tasks(&plan).unwrap();
    let mut ctx = WorkflowContext::new(plan, text, tasks);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let runner = executor(
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
        dir.path(),
    );
    let summary = runner.run_workflow(&mut ctx, &cancel, None).await;

    assert!(summary.cancelled);
    assert_eq!(ctx.count_with_status(TaskStatus::Pending), 2);
}
