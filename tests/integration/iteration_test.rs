//! Iteration Integration Tests
//!
//! The feedback loop on its own and wired into the pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use plan_pilot::models::evaluation::StopReason;
use plan_pilot::models::record::RecordStatus;
use plan_pilot::models::settings::PilotConfig;
use plan_pilot::services::iteration::{ensure_usable, FeedbackEvent, FeedbackLoop};
use plan_pilot::services::Pipeline;
use plan_pilot::storage::{Database, PlanningRecordStore};
use plan_pilot::AppError;
use plan_pilot_llm::{MessageRole, ReplayCollaborator};

use super::support::{test_config, CountingFiles, ScriptedCommands};

const PROSE: &str = "You could add a page under src, something like page.ts that returns a greeting.";

const UNCOVERED: &str = r#"```json
{"phase": "execution", "analysis": "Add a page",
 "plan": {"actionType": "CREATE", "filesToCreate": [{"path": "src/page.ts"}],
   "executionOrder": ["create src/page.ts"]}}
```"#;

const COVERED: &str = r#"```json
{"phase": "execution", "analysis": "Add a page", "isClear": true,
 "plan": {"actionType": "CREATE", "packages": [], "filesToCreate": [{"path": "src/page.ts"}],
   "executionOrder": ["create src/page.ts"]},
 "codeBlocks": [{"filePath": "src/page.ts", "content": "export function page() {\n  return 'hello';\n}\n"}]}
```"#;

fn pipeline_with(config: PilotConfig, replay: Arc<ReplayCollaborator>) -> Pipeline {
    Pipeline::new(
        config,
        replay,
        Arc::new(CountingFiles::default()),
        Arc::new(ScriptedCommands::default()),
        Arc::new(Database::new_in_memory().unwrap()),
    )
}

#[tokio::test]
async fn test_invalid_plan_is_never_usable() {
    let config = PilotConfig {
        max_iterations: 3,
        ..test_config()
    };
    let replay = Arc::new(ReplayCollaborator::new([UNCOVERED]).repeat_last());
    let feedback = FeedbackLoop::new(replay.clone(), &config);

    let mut history = Vec::new();
    let outcome = feedback
        .run("add a page", &mut history, &CancellationToken::new(), None)
        .await
        .unwrap();

    // Scores clear the threshold, but the missing code block keeps it unusable
    assert_eq!(outcome.stop_reason, StopReason::MaxIterations);
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.history.iter().all(|r| r.evaluation.score >= 70));
    assert!(outcome.history.iter().all(|r| !r.evaluation.is_usable));
    assert_eq!(history.len(), 6);

    let prompts = replay.prompts().await;
    assert_eq!(prompts[0].prompt, "add a page");
    assert!(prompts[1].prompt.starts_with("add a page\n\n## Revision 2 (previous score 80/100)"));
    assert!(prompts[1].prompt.contains("Add a codeBlocks entry for src/page.ts"));
    assert!(prompts[2].prompt.contains("## Revision 3"));
    assert!(!prompts[2].prompt.contains("## Revision 2"));
    assert_eq!(prompts[2].history_len, 4);

    assert!(matches!(
        ensure_usable(outcome),
        Err(AppError::IterationExhausted { iterations: 3, .. })
    ));
}

#[tokio::test]
async fn test_events_follow_each_round() {
    let replay = Arc::new(ReplayCollaborator::new([PROSE, COVERED]));
    let feedback = FeedbackLoop::new(replay, &test_config());

    let (tx, mut rx) = mpsc::channel(32);
    let mut history = Vec::new();
    let outcome = feedback
        .run("add a page", &mut history, &CancellationToken::new(), Some(&tx))
        .await
        .unwrap();
    drop(tx);

    assert!(outcome.success());
    assert_eq!(outcome.final_score(), Some(100));
    assert_eq!(outcome.best().unwrap().iteration, 2);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds.push(match event {
            FeedbackEvent::IterationStarted { .. } => "started",
            FeedbackEvent::ResponseReceived { .. } => "received",
            FeedbackEvent::Evaluated { .. } => "evaluated",
            FeedbackEvent::PromptEnhanced { escalated, .. } => {
                assert!(escalated);
                "enhanced"
            }
            FeedbackEvent::Finished { stop_reason, iterations } => {
                assert_eq!(stop_reason, StopReason::Usable);
                assert_eq!(iterations, 2);
                "finished"
            }
        });
    }
    assert_eq!(
        kinds,
        vec![
            "started", "received", "evaluated", "enhanced", "started", "received", "evaluated",
            "finished"
        ]
    );
}

#[tokio::test]
async fn test_pipeline_hardens_only_the_first_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let config = PilotConfig {
        harden_initial_prompt: true,
        ..test_config()
    };
    let replay = Arc::new(ReplayCollaborator::new([PROSE, COVERED, "Glad it worked."]));
    let pipeline = pipeline_with(config, replay.clone());
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .submit(&session_id, "add a page", &CancellationToken::new(), None)
        .await
        .unwrap();
    let hardening = report.hardening.as_ref().unwrap();
    assert_eq!(hardening.history.len(), 2);
    assert!(report.run.is_completed());
    assert!(dir.path().join("src/page.ts").exists());

    let second = pipeline
        .submit(&session_id, "thanks", &CancellationToken::new(), None)
        .await
        .unwrap();
    assert!(second.hardening.is_none());
    assert_eq!(replay.call_count().await, 3);

    let session = pipeline.sessions().lookup(&session_id).await.unwrap();
    let session = session.lock().await;
    assert_eq!(session.history.len(), 6);
    assert_eq!(session.history[4].role, MessageRole::User);
    assert_eq!(session.history[4].content, "thanks");
}

#[tokio::test]
async fn test_auto_answer_routes_follow_ups_through_feedback() {
    let dir = tempfile::tempdir().unwrap();
    let config = PilotConfig {
        auto_answer: true,
        ..test_config()
    };
    let question = r#"```json
{"phase": "planning", "isClear": false, "questions": ["Which folder?"]}
```"#;
    let replay = Arc::new(ReplayCollaborator::new([UNCOVERED, COVERED]));
    let pipeline = pipeline_with(config, replay.clone());
    let session_id = pipeline.open_session(dir.path()).await;

    let report = pipeline
        .execute_response(&session_id, "add a page", question.to_string(), &CancellationToken::new(), None)
        .await
        .unwrap();

    // One clarification round, hardened over two generations
    assert_eq!(report.run.depth, 1);
    assert!(report.run.is_completed());
    assert_eq!(replay.call_count().await, 2);
    assert!(replay.prompts().await[1].prompt.contains("## Revision 2"));
}

#[tokio::test]
async fn test_exhausted_hardening_stops_before_execution() {
    let dir = tempfile::tempdir().unwrap();
    let config = PilotConfig {
        harden_initial_prompt: true,
        max_iterations: 3,
        ..test_config()
    };
    let replay = Arc::new(ReplayCollaborator::new([UNCOVERED]).repeat_last());
    let db = Arc::new(Database::new_in_memory().unwrap());
    let files = Arc::new(CountingFiles::default());
    let pipeline = Pipeline::new(
        config,
        replay.clone(),
        files.clone(),
        Arc::new(ScriptedCommands::default()),
        db.clone(),
    );
    let session_id = pipeline.open_session(dir.path()).await;

    let result = pipeline
        .submit(&session_id, "add a page", &CancellationToken::new(), None)
        .await;

    assert!(matches!(
        result,
        Err(AppError::IterationExhausted { iterations: 3, .. })
    ));
    assert_eq!(replay.call_count().await, 3);
    assert_eq!(files.writes(), 0);
    assert!(!dir.path().join("src/page.ts").exists());

    // The attempts stay in the session and the best one is recorded
    let session = pipeline.sessions().lookup(&session_id).await.unwrap();
    assert_eq!(session.lock().await.history.len(), 6);
    let records = db.list(&dir.path().display().to_string()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert!(records[0].plan.is_some());
}
