//! Clarification Integration Tests
//!
//! Follow-up rounds driven through the pipeline: rejected plans, compile
//! errors, execution conflicts, the depth limit and cancellation.

use std::fs;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use plan_pilot::models::record::RecordStatus;
use plan_pilot::services::ClarificationOutcome;
use plan_pilot::storage::PlanningRecordStore;
use plan_pilot::AppError;
use plan_pilot_llm::ReplayCollaborator;

use super::support::{pipeline, CountingFiles, ScriptedCommands};

const QUESTION: &str = r#"```json
{"phase": "planning", "isClear": false, "questions": ["Which folder should the page live in?"]}
```"#;

const UNCOVERED: &str = r#"```json
{"phase": "execution", "analysis": "Add a page",
 "plan": {"actionType": "CREATE", "filesToCreate": [{"path": "src/page.ts"}],
   "executionOrder": ["create src/page.ts"]}}
```"#;

const COVERED: &str = r#"```json
{"phase": "execution", "analysis": "Add a page",
 "plan": {"actionType": "CREATE", "filesToCreate": [{"path": "src/page.ts"}],
   "executionOrder": ["create src/page.ts"]},
 "codeBlocks": [{"filePath": "src/page.ts", "content": "export function page() {\n  return 'hello';\n}\n"}]}
```"#;

const CYCLE: &str = r#"```json
{"phase": "execution", "tasks": [
  {"id": "a", "type": "info", "description": "first", "dependencies": ["b"]},
  {"id": "b", "type": "info", "description": "second", "dependencies": ["a"]}
]}
```"#;

#[tokio::test]
async fn test_rejected_plan_is_sent_back_with_issues() {
    let dir = tempfile::tempdir().unwrap();
    let replay = Arc::new(ReplayCollaborator::new([COVERED]));
    let (pipeline, _db) = pipeline(
        replay.clone(),
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
    );
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "add a page", UNCOVERED.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(report.run.is_completed());
    assert_eq!(report.run.depth, 1);
    assert_eq!(report.record_status, RecordStatus::Executed);
    assert!(dir.path().join("src/page.ts").exists());

    let prompts = replay.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].prompt.contains("No code block provided for src/page.ts"));
    assert!(prompts[0].prompt.contains("add a page"));
    // The captured request and response were already in the history
    assert_eq!(prompts[0].history_len, 2);
}

#[tokio::test]
async fn test_compile_error_is_sent_back() {
    let dir = tempfile::tempdir().unwrap();
    let replay = Arc::new(ReplayCollaborator::new([COVERED]));
    let (pipeline, _db) = pipeline(
        replay.clone(),
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
    );
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "add a page", CYCLE.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(report.run.is_completed());
    assert!(report.run.triggers[0].contains("Circular dependency"));
    assert!(replay.prompts().await[0].prompt.contains("Circular dependency"));
}

#[tokio::test]
async fn test_execution_conflict_then_modify() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/page.ts"), "export const old = true;\n").unwrap();

    let modify = r#"```json
{"phase": "execution", "analysis": "Update the existing page",
 "plan": {"actionType": "MODIFY", "filesToModify": [{"path": "src/page.ts"}],
   "executionOrder": ["modify src/page.ts"]},
 "codeBlocks": [{"filePath": "src/page.ts", "content": "export function page() {\n  return 'updated';\n}\n"}]}
```"#;
    let replay = Arc::new(ReplayCollaborator::new([modify]));
    let files = Arc::new(CountingFiles::default());
    let (pipeline, db) = pipeline(replay.clone(), files.clone(), Arc::new(ScriptedCommands::default()));
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "add a page", COVERED.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(report.run.is_completed());
    assert_eq!(report.run.depth, 1);
    assert_eq!(report.run.raised.len(), 1);
    assert_eq!(report.run.raised[0].file_exists, Some(true));
    assert_eq!(files.writes(), 1);
    assert!(fs::read_to_string(dir.path().join("src/page.ts"))
        .unwrap()
        .contains("updated"));

    let prompt = &replay.prompts().await[0].prompt;
    assert!(prompt.contains("src/page.ts already exists"));

    let project = dir.path().display().to_string();
    let saved = db.read(&project, &report.record_id).unwrap().unwrap();
    assert_eq!(saved.status, RecordStatus::Executed);
    assert!(saved.response.contains("updated"));
}

#[tokio::test]
async fn test_depth_limit_needs_input() {
    let dir = tempfile::tempdir().unwrap();
    let replay = Arc::new(ReplayCollaborator::new([QUESTION]).repeat_last());
    let (pipeline, db) = pipeline(
        replay.clone(),
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
    );
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "add a page", QUESTION.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(replay.call_count().await, 5);
    assert_eq!(report.run.depth, 5);
    assert_eq!(report.run.triggers.len(), 6);
    assert_eq!(report.record_status, RecordStatus::NeedsInput);
    assert!(matches!(
        report.run.outcome,
        ClarificationOutcome::ManualIntervention { .. }
    ));

    let project = dir.path().display().to_string();
    assert_eq!(db.list(&project).unwrap().len(), 1);
    assert!(matches!(
        report.run.ensure_resolved(),
        Err(AppError::RecursionExhausted { depth: 5 })
    ));
}

#[tokio::test]
async fn test_cancelled_before_first_round() {
    let dir = tempfile::tempdir().unwrap();
    let replay = Arc::new(ReplayCollaborator::new([COVERED]));
    let files = Arc::new(CountingFiles::default());
    let (pipeline, _db) = pipeline(replay.clone(), files.clone(), Arc::new(ScriptedCommands::default()));
    let session_id = pipeline.open_session(dir.path()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = pipeline
        .execute_response(&session_id, "add a page", COVERED.to_string(), &cancel, None)
        .await
        .unwrap();

    assert!(matches!(report.run.outcome, ClarificationOutcome::Cancelled));
    assert_eq!(report.record_status, RecordStatus::Draft);
    assert_eq!(files.writes(), 0);
    assert_eq!(replay.call_count().await, 0);
}

#[tokio::test]
async fn test_failed_build_is_sent_back() {
    let dir = tempfile::tempdir().unwrap();
    let failing = r#"```json
{"phase": "execution", "tasks": [
  {"id": "build", "type": "command", "description": "build the app", "command": "npm run build"}
]}
```"#;
    let fixed = r#"```json
{"phase": "execution", "tasks": [
  {"id": "compile", "type": "command", "description": "compile the app", "command": "npm run compile"}
]}
```"#;
    let replay = Arc::new(ReplayCollaborator::new([fixed]));
    let commands = Arc::new(ScriptedCommands::default().with_exit("npm run build", 1));
    let (pipeline, _db) = pipeline(replay.clone(), Arc::new(CountingFiles::default()), commands.clone());
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "build it", failing.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(report.run.is_completed());
    assert_eq!(report.run.depth, 1);
    assert_eq!(report.record_status, RecordStatus::Executed);
    assert_eq!(commands.ran().await, vec!["npm run build".to_string(), "npm run compile".to_string()]);

    let failure = report.run.raised[0].failure_context.as_ref().unwrap();
    assert_eq!(failure.operation, "run_command");
    assert_eq!(failure.error_type, "exit_status");

    let prompt = &replay.prompts().await[0].prompt;
    assert!(prompt.contains("`npm run build` exited with code 1"));
    assert!(prompt.contains("run_command failed (exit_status): failed"));
}
