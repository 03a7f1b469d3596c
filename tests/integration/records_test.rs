//! Planning Record Integration Tests

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use plan_pilot::models::plan::Phase;
use plan_pilot::models::record::{PlanningRecord, RecordStatus};
use plan_pilot::services::extraction::extract_plan;
use plan_pilot::storage::{Database, PlanningRecordStore};
use plan_pilot_llm::ReplayCollaborator;

use super::support::{pipeline, CountingFiles, ScriptedCommands};

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("records.db");

    let plan = extract_plan(r#"{"phase": "planning", "isClear": false, "questions": ["Which router?"]}"#)
        .into_plan()
        .unwrap();
    let record = PlanningRecord::new("/work/site", "Add a blog\nwith tags", "raw response")
        .with_plan(plan)
        .with_status(RecordStatus::NeedsInput);
    {
        let db = Database::open(&path).unwrap();
        db.save(&record).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let loaded = db.read("/work/site", &record.id).unwrap().unwrap();
    assert_eq!(loaded.title, "Add a blog");
    assert_eq!(loaded.status, RecordStatus::NeedsInput);
    let plan = loaded.plan.unwrap();
    assert_eq!(plan.phase, Some(Phase::Planning));
    assert_eq!(plan.questions, vec!["Which router?".to_string()]);
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[test]
fn test_list_is_newest_first() {
    let db = Database::new_in_memory().unwrap();
    let first = PlanningRecord::new("/p", "first", "");
    let second = PlanningRecord::new("/p", "second", "");
    db.save(&first).unwrap();
    db.save(&second).unwrap();

    let titles: Vec<_> = db.list("/p").unwrap().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["second".to_string(), "first".to_string()]);

    assert!(db.delete("/p", &first.id).unwrap());
    assert!(!db.delete("/p", &first.id).unwrap());
    assert_eq!(db.list("/p").unwrap().len(), 1);
}

#[tokio::test]
async fn test_pipeline_records_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let failing = r#"```json
{"phase": "execution", "tasks": [
  {"id": "build", "type": "command", "description": "build", "command": "npm run build"}
]}
```"#;
    let commands = Arc::new(ScriptedCommands::default().with_exit("npm run build", 1));
    // The failed build is sent back and the model answers without a plan
    let replay = Arc::new(ReplayCollaborator::new([
        "The build script is missing from package.json, so there is nothing to run.",
    ]));
    let (pipeline, db) = pipeline(replay.clone(), Arc::new(CountingFiles::default()), commands);
    let session_id = pipeline.open_session(dir.path()).await;
    let cancel = CancellationToken::new();

    let failed = pipeline
        .execute_response(&session_id, "build it", failing.to_string(), &cancel, None)
        .await
        .unwrap();
    assert_eq!(failed.record_status, RecordStatus::Failed);
    assert_eq!(failed.run.depth, 1);
    assert_eq!(replay.call_count().await, 1);

    let plain = pipeline
        .execute_response(&session_id, "what is this repo?", "A small web app.".to_string(), &cancel, None)
        .await
        .unwrap();
    assert_eq!(plain.record_status, RecordStatus::Draft);

    let project = dir.path().display().to_string();
    let records = db.list(&project).unwrap();
    assert_eq!(records.len(), 2);
    let saved = db.read(&project, &failed.record_id).unwrap().unwrap();
    assert_eq!(saved.status, RecordStatus::Failed);
    assert_eq!(saved.prompt, "build it");
    assert!(saved.plan.is_none());
    assert!(saved.response.contains("build script is missing"));
    assert!(db.read(&project, &plain.record_id).unwrap().unwrap().plan.is_none());
}
