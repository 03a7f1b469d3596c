//! End-to-end scenarios from raw response text to files on disk.

use std::fs;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use plan_pilot::models::plan::{Phase, TaskStatus};
use plan_pilot::services::extraction::extract_plan;
use plan_pilot::services::validation::PlanValidator;
use plan_pilot_llm::ReplayCollaborator;

use super::support::{compiler, executor, pipeline, CountingFiles, ScriptedCommands};

const PACKAGE_JSON: &str = "{\n  \"name\": \"existing-app\",\n  \"version\": \"1.0.0\"\n}\n";

const CREATE_PACKAGE_JSON: &str = r#"```json
{"phase": "execution", "analysis": "Initialize the project manifest",
 "plan": {"actionType": "CREATE", "filesToCreate": [{"path": "package.json"}],
   "executionOrder": ["create package.json"]},
 "codeBlocks": [{"filePath": "package.json", "content": "{\n  \"name\": \"new-app\",\n  \"private\": true\n}\n"}]}
```"#;

#[tokio::test]
async fn test_creates_a_new_page() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"Here is the plan:
```json
{"phase": "execution", "analysis": "Add a hello page", "isClear": true,
 "plan": {"actionType": "CREATE", "packages": [],
   "filesToCreate": [{"path": "app/hello/page.tsx", "purpose": "hello page"}],
   "executionOrder": ["create app/hello/page.tsx"]},
 "codeBlocks": [{"filePath": "app/hello/page.tsx", "language": "tsx",
   "content": "export default () => <h1>Hello</h1>;\n"}]}
```"#;
    let outcome = extract_plan(text);
    assert!(PlanValidator::default().validate_response(text, &outcome, None).is_clean());
    let plan = outcome.into_plan().unwrap();
    let mut ctx = compiler().compile(&plan, text).unwrap();

    let files = Arc::new(CountingFiles::default());
    let runner = executor(files.clone(), Arc::new(ScriptedCommands::default()), dir.path());
    let summary = runner.run_workflow(&mut ctx, &CancellationToken::new(), None).await;

    assert!(summary.success());
    assert_eq!(files.writes(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("app/hello/page.tsx")).unwrap(),
        "export default () => <h1>Hello</h1>;\n"
    );
    let task = &ctx.tasks[0];
    assert_eq!(task.status, TaskStatus::Completed);
    let result = task.result.as_ref().unwrap();
    assert!(result.success);
    assert!(result.message.contains("app/hello/page.tsx"));
    assert_eq!(result.data.as_ref().unwrap()["written"][0], "app/hello/page.tsx");
}

#[tokio::test]
async fn test_existing_manifest_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), PACKAGE_JSON).unwrap();

    let plan = extract_plan(CREATE_PACKAGE_JSON).into_plan().unwrap();
    let mut ctx = compiler().compile(&plan, CREATE_PACKAGE_JSON).unwrap();
    let files = Arc::new(CountingFiles::default());
    let runner = executor(files.clone(), Arc::new(ScriptedCommands::default()), dir.path());
    let summary = runner.run_workflow(&mut ctx, &CancellationToken::new(), None).await;

    assert_eq!(files.writes(), 0);
    assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), PACKAGE_JSON);
    assert_eq!(summary.clarifications.len(), 1);
    assert_eq!(summary.clarifications[0].target_path, "package.json");
    assert_eq!(summary.clarifications[0].file_exists, Some(true));
}

#[tokio::test]
async fn test_existing_manifest_without_follow_up_available() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), PACKAGE_JSON).unwrap();

    // The follow-up generation fails, so the run surfaces the collaborator error
    let replay = Arc::new(ReplayCollaborator::new(Vec::<String>::new()));
    let files = Arc::new(CountingFiles::default());
    let (pipeline, _db) = pipeline(replay, files.clone(), Arc::new(ScriptedCommands::default()));
    let session_id = pipeline.open_session(dir.path()).await;

    let result = pipeline
        .execute_response(
            &session_id,
            "set up the project",
            CREATE_PACKAGE_JSON.to_string(),
            &CancellationToken::new(),
            None,
        )
        .await;

    assert!(result.is_err());
    assert_eq!(files.writes(), 0);
    assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), PACKAGE_JSON);
}

#[test]
fn test_single_quoted_block_with_trailing_comma() {
    let text = "Here is the plan: ```json {'phase': 'planning', 'plan': {},} ``` Hope that helps!";
    let plan = extract_plan(text).into_plan().unwrap();
    assert_eq!(plan.phase, Some(Phase::Planning));
}
