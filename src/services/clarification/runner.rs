//! Clarification Loop
//!
//! Drives one response through extract, validate, compile and execute. When a
//! round cannot finish (open questions, a rejected plan, a compile failure, or
//! clarification requests raised by tasks) a directive is sent back to the
//! model and the new answer starts the next round.
//!
//! The loop is iterative with an explicit depth counter: at most
//! `max_clarification_depth` follow-up generations are issued, after which the
//! run stops with `ManualIntervention`.

use std::sync::Arc;

use plan_pilot_llm::{GenerativeCollaborator, Message};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::detector::detect_questions;
use super::directive::{build_directive, ClarificationTrigger, DirectiveContext};
use crate::models::plan::{GeneratedPlan, TaskStatus};
use crate::models::settings::PilotConfig;
use crate::models::workflow::ClarificationRequest;
use crate::services::extraction::extract_plan;
use crate::services::generation::request_text;
use crate::services::iteration::FeedbackLoop;
use crate::services::session::Session;
use crate::services::validation::PlanValidator;
use crate::services::workflow::{TaskExecutor, WorkflowCompiler, WorkflowEvent, WorkflowSummary};
use crate::utils::error::{AppError, AppResult};

/// How a clarification run ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClarificationOutcome {
    /// A plan was executed to the end
    Completed { summary: WorkflowSummary },
    /// The final response carried no plan and asked nothing
    PlainText,
    /// The depth limit was reached with something still unresolved
    ManualIntervention { reason: String },
    Cancelled,
}

/// Everything a clarification run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationRun {
    pub outcome: ClarificationOutcome,
    /// Follow-up generations issued
    pub depth: u32,
    pub final_response: String,
    /// Plan of the last round, if one was extracted
    pub plan: Option<GeneratedPlan>,
    /// Every clarification request raised by tasks, across all rounds
    pub raised: Vec<ClarificationRequest>,
    /// One line per round that needed a follow-up
    pub triggers: Vec<String>,
}

impl ClarificationRun {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, ClarificationOutcome::Completed { .. })
    }

    /// Turn a depth-exhausted or cancelled run into an error
    pub fn ensure_resolved(self) -> AppResult<Self> {
        match &self.outcome {
            ClarificationOutcome::ManualIntervention { .. } => {
                Err(AppError::RecursionExhausted { depth: self.depth })
            }
            ClarificationOutcome::Cancelled => Err(AppError::cancelled("clarification loop")),
            _ => Ok(self),
        }
    }
}

enum Round {
    Done(ClarificationOutcome),
    Clarify(ClarificationTrigger),
}

/// Bounded self-correction around the task executor
pub struct ClarificationLoop {
    collaborator: Arc<dyn GenerativeCollaborator>,
    compiler: WorkflowCompiler,
    executor: TaskExecutor,
    validator: PlanValidator,
    feedback: Option<FeedbackLoop>,
    config: PilotConfig,
}

impl ClarificationLoop {
    pub fn new(
        collaborator: Arc<dyn GenerativeCollaborator>,
        compiler: WorkflowCompiler,
        executor: TaskExecutor,
        config: &PilotConfig,
    ) -> Self {
        let feedback = config
            .auto_answer
            .then(|| FeedbackLoop::new(collaborator.clone(), config));
        Self {
            collaborator,
            compiler,
            executor,
            validator: PlanValidator::from_config(config),
            feedback,
            config: config.clone(),
        }
    }

    /// Resolve `response` (the model's answer to `request`) within `session`.
    ///
    /// Follow-ups are appended to the session history. Only a collaborator
    /// failure is returned as `Err`.
    pub async fn run(
        &self,
        session: &mut Session,
        request: &str,
        response: String,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> AppResult<ClarificationRun> {
        let mut run = ClarificationRun {
            outcome: ClarificationOutcome::PlainText,
            depth: 0,
            final_response: response,
            plan: None,
            raised: Vec::new(),
            triggers: Vec::new(),
        };
        let mut completed: Vec<String> = Vec::new();
        let mut found: Vec<String> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                run.outcome = ClarificationOutcome::Cancelled;
                break;
            }

            let round = self
                .round(session, &mut run, &mut completed, &mut found, cancel, events)
                .await?;
            let trigger = match round {
                Round::Done(outcome) => {
                    run.outcome = outcome;
                    break;
                }
                Round::Clarify(trigger) => trigger,
            };

            run.triggers.push(trigger.describe());
            if run.depth >= self.config.max_clarification_depth {
                warn!(
                    session_id = %session.id,
                    depth = run.depth,
                    trigger = trigger.kind(),
                    "Clarification depth exhausted, manual intervention needed"
                );
                run.outcome = ClarificationOutcome::ManualIntervention {
                    reason: trigger.describe(),
                };
                break;
            }

            let mut known_files: Vec<String> = session.source_cache.keys().cloned().collect();
            known_files.sort();
            for path in &found {
                if !known_files.contains(path) {
                    known_files.push(path.clone());
                }
            }
            let directive = build_directive(
                &trigger,
                &DirectiveContext {
                    original_request: request,
                    known_files: &known_files,
                    completed: &completed,
                },
            );

            run.depth += 1;
            info!(
                session_id = %session.id,
                depth = run.depth,
                trigger = trigger.kind(),
                "Requesting clarification follow-up"
            );
            match self.follow_up(&directive, &mut session.history, cancel).await? {
                Some(text) => run.final_response = text,
                None => {
                    run.outcome = ClarificationOutcome::Cancelled;
                    break;
                }
            }
        }

        info!(
            session_id = %session.id,
            depth = run.depth,
            raised = run.raised.len(),
            completed = run.is_completed(),
            "Clarification loop finished"
        );
        Ok(run)
    }

    async fn round(
        &self,
        session: &mut Session,
        run: &mut ClarificationRun,
        completed: &mut Vec<String>,
        found: &mut Vec<String>,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> AppResult<Round> {
        let response = run.final_response.as_str();
        let outcome = extract_plan(response);
        run.plan = outcome.plan().cloned();

        let questions = detect_questions(outcome.plan(), response);
        if !questions.is_empty() {
            return Ok(Round::Clarify(ClarificationTrigger::Questions(questions)));
        }

        let report = self.validator.validate_response(response, &outcome, None);
        let Some(plan) = outcome.into_plan() else {
            if report.is_valid() {
                debug!(chars = response.len(), "No plan in response, keeping plain text");
                return Ok(Round::Done(ClarificationOutcome::PlainText));
            }
            return Ok(Round::Clarify(ClarificationTrigger::Validation(report)));
        };
        if !report.is_valid() {
            return Ok(Round::Clarify(ClarificationTrigger::Validation(report)));
        }

        let ctx = match self.compiler.compile(&plan, response) {
            Ok(ctx) => ctx,
            Err(AppError::Compile(message)) => {
                return Ok(Round::Clarify(ClarificationTrigger::Compile(message)));
            }
            Err(e) => return Err(e),
        };

        let ctx = session.begin_workflow(ctx);
        let summary = self.executor.run_workflow(ctx, cancel, events).await;
        if let Some(finished) = session.end_workflow() {
            completed.extend(
                finished
                    .tasks
                    .iter()
                    .filter(|t| t.status == TaskStatus::Completed)
                    .map(|t| t.description.clone()),
            );
            for path in finished.found_files {
                if !found.contains(&path) {
                    found.push(path);
                }
            }
        }

        if summary.cancelled {
            return Ok(Round::Done(ClarificationOutcome::Cancelled));
        }
        if !summary.clarifications.is_empty() {
            run.raised.extend(summary.clarifications.iter().cloned());
            return Ok(Round::Clarify(ClarificationTrigger::Execution(
                summary.clarifications,
            )));
        }
        Ok(Round::Done(ClarificationOutcome::Completed { summary }))
    }

    /// One follow-up generation, direct or through the feedback loop.
    /// `None` when cancelled before anything was generated.
    async fn follow_up(
        &self,
        directive: &str,
        history: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> AppResult<Option<String>> {
        if let Some(feedback) = &self.feedback {
            let outcome = feedback.run(directive, history, cancel, None).await?;
            return Ok(outcome.best().map(|r| r.response.clone()));
        }

        let text = request_text(self.collaborator.as_ref(), directive, history, self.config.stream).await?;
        history.push(Message::user(directive));
        history.push(Message::assistant(text.clone()));
        Ok(Some(text))
    }
}
