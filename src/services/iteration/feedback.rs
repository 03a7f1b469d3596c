//! Feedback Loop
//!
//! Generate, score, enhance, repeat. Each round sends the current prompt with
//! the accumulated conversation, scores the response, and either stops or
//! builds an enhanced prompt for the next round. The loop stops on:
//! - a usable response
//! - `max_iterations` rounds
//! - `max_low_score_streak` consecutive scores under the hard floor
//! - cancellation, observed between rounds
//!
//! A collaborator failure aborts the run with `AppError::Generation`.

use std::sync::Arc;
use std::time::Instant;

use plan_pilot_llm::{GenerativeCollaborator, Message};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::evaluator::ResponseEvaluator;
use super::prompt_enhancer::enhance;
use crate::models::evaluation::{FeedbackOutcome, IterationRecord, StopReason};
use crate::models::settings::PilotConfig;
use crate::services::generation::request_text;
use crate::utils::error::{AppError, AppResult};

/// Progress events emitted by the feedback loop
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    /// A generation round started
    IterationStarted { iteration: u32 },
    /// The collaborator answered
    ResponseReceived { iteration: u32, chars: usize },
    /// The response was scored
    Evaluated {
        iteration: u32,
        score: u32,
        is_usable: bool,
    },
    /// The next prompt was built
    PromptEnhanced { iteration: u32, escalated: bool },
    /// The loop stopped
    Finished {
        stop_reason: StopReason,
        iterations: u32,
    },
}

/// Iterative prompt hardening against one collaborator
pub struct FeedbackLoop {
    collaborator: Arc<dyn GenerativeCollaborator>,
    evaluator: ResponseEvaluator,
    config: PilotConfig,
}

impl FeedbackLoop {
    pub fn new(collaborator: Arc<dyn GenerativeCollaborator>, config: &PilotConfig) -> Self {
        Self {
            collaborator,
            evaluator: ResponseEvaluator::from_config(config),
            config: config.clone(),
        }
    }

    pub fn evaluator(&self) -> &ResponseEvaluator {
        &self.evaluator
    }

    /// Run the loop from `prompt`, appending every exchange to `history`
    pub async fn run(
        &self,
        prompt: &str,
        history: &mut Vec<Message>,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<FeedbackEvent>>,
    ) -> AppResult<FeedbackOutcome> {
        let mut records: Vec<IterationRecord> = Vec::new();
        let mut current_prompt = prompt.to_string();
        let mut low_streak = 0u32;
        let mut stop_reason = StopReason::MaxIterations;

        info!(
            collaborator = self.collaborator.name(),
            max_iterations = self.config.max_iterations,
            threshold = self.evaluator.threshold(),
            "Starting feedback loop"
        );

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }
            emit(events, FeedbackEvent::IterationStarted { iteration }).await;

            let started = Instant::now();
            let response = request_text(
                self.collaborator.as_ref(),
                &current_prompt,
                history,
                self.config.stream,
            )
            .await
            .map_err(AppError::Generation)?;
            emit(
                events,
                FeedbackEvent::ResponseReceived {
                    iteration,
                    chars: response.len(),
                },
            )
            .await;

            let scored = self.evaluator.evaluate(&response);
            let evaluation = scored.evaluation.clone();
            debug!(
                iteration,
                score = evaluation.score,
                usable = evaluation.is_usable,
                missing = evaluation.missing_elements.len(),
                "Scored response"
            );
            emit(
                events,
                FeedbackEvent::Evaluated {
                    iteration,
                    score: evaluation.score,
                    is_usable: evaluation.is_usable,
                },
            )
            .await;

            history.push(Message::user(current_prompt.clone()));
            history.push(Message::assistant(response.clone()));
            records.push(IterationRecord {
                iteration,
                prompt: current_prompt.clone(),
                response,
                evaluation: evaluation.clone(),
                extracted: scored.plan.is_some(),
                duration_ms: started.elapsed().as_millis() as u64,
            });

            if evaluation.is_usable {
                stop_reason = StopReason::Usable;
                break;
            }

            if evaluation.score < self.config.hard_floor {
                low_streak += 1;
                if low_streak >= self.config.max_low_score_streak {
                    warn!(iteration, streak = low_streak, "Aborting after repeated very low scores");
                    stop_reason = StopReason::LowScoreAbort;
                    break;
                }
            } else {
                low_streak = 0;
            }

            if iteration < self.config.max_iterations {
                current_prompt = enhance(
                    prompt,
                    &evaluation,
                    iteration + 1,
                    self.config.low_quality_floor,
                );
                emit(
                    events,
                    FeedbackEvent::PromptEnhanced {
                        iteration,
                        escalated: evaluation.score < self.config.low_quality_floor,
                    },
                )
                .await;
            }
        }

        let iterations = records.len() as u32;
        info!(
            iterations,
            stop_reason = %stop_reason,
            final_score = ?records.last().map(|r| r.evaluation.score),
            "Feedback loop finished"
        );
        emit(
            events,
            FeedbackEvent::Finished {
                stop_reason,
                iterations,
            },
        )
        .await;

        Ok(FeedbackOutcome {
            stop_reason,
            history: records,
        })
    }
}

/// Turn an exhausted run into `AppError::IterationExhausted`
pub fn ensure_usable(outcome: FeedbackOutcome) -> AppResult<FeedbackOutcome> {
    match outcome.stop_reason {
        StopReason::Usable => Ok(outcome),
        StopReason::Cancelled => Err(AppError::cancelled("feedback loop")),
        reason => Err(AppError::IterationExhausted {
            iterations: outcome.history.len() as u32,
            reason: reason.to_string(),
        }),
    }
}

async fn emit(events: Option<&mpsc::Sender<FeedbackEvent>>, event: FeedbackEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
