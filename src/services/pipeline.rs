//! Pipeline
//!
//! Facade over the whole request flow for one process: sessions, the optional
//! hardening pass over a session's first prompt, the clarification loop around
//! execution, and the planning-record store.

use std::path::Path;
use std::sync::Arc;

use plan_pilot_core::{CommandCollaborator, FileCollaborator};
use plan_pilot_llm::{GenerativeCollaborator, Message};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::evaluation::{FeedbackOutcome, StopReason};
use crate::models::plan::{GeneratedPlan, Task};
use crate::models::record::{PlanningRecord, RecordStatus};
use crate::models::settings::PilotConfig;
use crate::services::clarification::{ClarificationLoop, ClarificationOutcome, ClarificationRun};
use crate::services::extraction::{extract_plan, ExtractionOutcome};
use crate::services::generation::request_text;
use crate::services::inference::{BestEffortInference, HeuristicInference};
use crate::services::iteration::{ensure_usable, FeedbackLoop};
use crate::services::session::{Session, SessionRegistry};
use crate::services::validation::{PlanValidator, ProjectTreeOracle, ValidationReport};
use crate::services::workflow::{TaskExecutor, WorkflowCompiler, WorkflowEvent};
use crate::storage::PlanningRecordStore;
use crate::utils::error::{AppError, AppResult};

/// Result of one request through the pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub session_id: String,
    pub record_id: String,
    pub record_status: RecordStatus,
    /// Feedback loop history when the prompt was hardened first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardening: Option<FeedbackOutcome>,
    pub run: ClarificationRun,
}

/// A compiled but not executed response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRun {
    pub plan: GeneratedPlan,
    pub report: ValidationReport,
    /// Empty when the plan was rejected or could not be compiled
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,
}

/// Owns the collaborators and the sessions of one process
pub struct Pipeline {
    config: PilotConfig,
    generative: Arc<dyn GenerativeCollaborator>,
    files: Arc<dyn FileCollaborator>,
    commands: Arc<dyn CommandCollaborator>,
    inference: Arc<dyn BestEffortInference>,
    records: Arc<dyn PlanningRecordStore>,
    sessions: SessionRegistry,
}

impl Pipeline {
    pub fn new(
        config: PilotConfig,
        generative: Arc<dyn GenerativeCollaborator>,
        files: Arc<dyn FileCollaborator>,
        commands: Arc<dyn CommandCollaborator>,
        records: Arc<dyn PlanningRecordStore>,
    ) -> Self {
        Self {
            config,
            generative,
            files,
            commands,
            inference: Arc::new(HeuristicInference),
            records,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn records(&self) -> &dyn PlanningRecordStore {
        self.records.as_ref()
    }

    pub async fn open_session(&self, project_path: impl AsRef<Path>) -> String {
        self.sessions.create(project_path.as_ref()).await
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        self.sessions.destroy(session_id).await
    }

    /// Ask the model for `request` and drive its answer to completion
    pub async fn submit(
        &self,
        session_id: &str,
        request: &str,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> AppResult<PipelineReport> {
        let session = self.session(session_id).await?;
        let mut session = session.lock().await;

        let mut hardening = None;
        let response = if self.config.harden_initial_prompt && session.history.is_empty() {
            let feedback = FeedbackLoop::new(self.generative.clone(), &self.config);
            let outcome = feedback.run(request, &mut session.history, cancel, None).await?;
            if !outcome.success() && outcome.stop_reason != StopReason::Cancelled {
                self.record_unusable(&session, request, &outcome);
            }
            let outcome = ensure_usable(outcome)?;
            let best = outcome.best().map(|r| r.response.clone());
            hardening = Some(outcome);
            match best {
                Some(text) => text,
                None => return Err(AppError::cancelled("prompt hardening")),
            }
        } else {
            let text = request_text(self.generative.as_ref(), request, &session.history, self.config.stream).await?;
            session.push(Message::user(request));
            session.push(Message::assistant(text.clone()));
            text
        };

        let mut report = self.resolve(&mut session, request, response, cancel, events).await?;
        report.hardening = hardening;
        Ok(report)
    }

    /// Drive an already captured response to completion
    pub async fn execute_response(
        &self,
        session_id: &str,
        request: &str,
        response: String,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> AppResult<PipelineReport> {
        let session = self.session(session_id).await?;
        let mut session = session.lock().await;
        session.push(Message::user(request));
        session.push(Message::assistant(response.clone()));
        self.resolve(&mut session, request, response, cancel, events).await
    }

    /// Extract, validate against the project tree, and compile without executing
    pub fn dry_run(&self, response: &str, project_path: &Path) -> AppResult<DryRun> {
        let outcome = extract_plan(response);
        let validator = PlanValidator::from_config(&self.config);
        let oracle = ProjectTreeOracle::new(project_path);
        let report = validator.validate_response(response, &outcome, Some(&oracle));

        let plan = match outcome {
            ExtractionOutcome::Extracted { plan, .. } => plan,
            ExtractionOutcome::NotFound { reason } => return Err(AppError::extraction(reason)),
        };

        let mut dry = DryRun {
            plan,
            report,
            tasks: Vec::new(),
            compile_error: None,
        };
        if dry.report.is_valid() {
            match WorkflowCompiler::new(self.inference.clone()).compile_tasks(&dry.plan) {
                Ok(tasks) => dry.tasks = tasks,
                Err(AppError::Compile(message)) => dry.compile_error = Some(message),
                Err(e) => return Err(e),
            }
        }
        Ok(dry)
    }

    async fn session(&self, session_id: &str) -> AppResult<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions
            .lookup(session_id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Session {}", session_id)))
    }

    /// Keep the best attempt of a hardening pass that never became usable
    fn record_unusable(&self, session: &Session, request: &str, outcome: &FeedbackOutcome) {
        let best = outcome.best();
        let response = best.map(|r| r.response.clone()).unwrap_or_default();
        let mut record = PlanningRecord::new(session.project_path.display().to_string(), request, response.clone())
            .with_status(RecordStatus::Failed);
        if let Some(plan) = extract_plan(&response).into_plan() {
            record = record.with_plan(plan);
        }
        warn!(
            session_id = %session.id,
            iterations = outcome.history.len(),
            best_score = best.map(|r| r.evaluation.score),
            stop_reason = %outcome.stop_reason,
            "Prompt hardening produced no usable response"
        );
        self.save_record(&record);
    }

    /// The run already happened; a failed save is reported but not fatal
    fn save_record(&self, record: &PlanningRecord) {
        if let Err(e) = self.records.save(record) {
            warn!(record_id = %record.id, error = %e, "Failed to save planning record");
        }
    }

    async fn resolve(
        &self,
        session: &mut Session,
        request: &str,
        response: String,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> AppResult<PipelineReport> {
        let executor = TaskExecutor::new(
            self.files.clone(),
            self.commands.clone(),
            self.inference.clone(),
            session.project_path.clone(),
            self.config.clone(),
        );
        let clarifier = ClarificationLoop::new(
            self.generative.clone(),
            WorkflowCompiler::new(self.inference.clone()),
            executor,
            &self.config,
        );
        let run = clarifier.run(session, request, response, cancel, events).await?;

        let status = match &run.outcome {
            ClarificationOutcome::Completed { summary } if summary.success() => RecordStatus::Executed,
            ClarificationOutcome::Completed { .. } => RecordStatus::Failed,
            ClarificationOutcome::ManualIntervention { .. } => RecordStatus::NeedsInput,
            // Something failed while executing and the follow-up offered no plan
            ClarificationOutcome::PlainText if run.raised.iter().any(|r| r.failure_context.is_some()) => {
                RecordStatus::Failed
            }
            ClarificationOutcome::PlainText | ClarificationOutcome::Cancelled => RecordStatus::Draft,
        };
        let mut record = PlanningRecord::new(
            session.project_path.display().to_string(),
            request,
            run.final_response.clone(),
        )
        .with_status(status);
        if let Some(plan) = &run.plan {
            record = record.with_plan(plan.clone());
        }

        self.save_record(&record);
        info!(
            session_id = %session.id,
            record_id = %record.id,
            status = %status,
            depth = run.depth,
            "Request resolved"
        );

        Ok(PipelineReport {
            session_id: session.id.clone(),
            record_id: record.id,
            record_status: status,
            hardening: None,
            run,
        })
    }
}
