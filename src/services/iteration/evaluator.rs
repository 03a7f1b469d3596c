//! Response Evaluator
//!
//! Scores a model response 0-100 by the weighted presence of what an
//! executable plan needs. The weights add up to 100:
//!
//! | Element                                   | Weight |
//! |-------------------------------------------|--------|
//! | structured payload recovered              | 20     |
//! | `phase`                                   | 5      |
//! | `analysis`                                | 5      |
//! | `plan.actionType`                         | 10     |
//! | `plan.executionOrder` or `tasks`          | 15     |
//! | packages named when an install is implied | 5      |
//! | one code block per planned file           | 20     |
//! | complete, non-placeholder content         | 15     |
//! | no open questions                         | 5      |

use crate::models::evaluation::EvaluationResult;
use crate::models::plan::GeneratedPlan;
use crate::models::settings::PilotConfig;
use crate::services::extraction::{extract_plan, ExtractionOutcome};
use crate::services::validation::{IssueKind, PlanValidator, ValidationReport};

const W_PAYLOAD: u32 = 20;
const W_PHASE: u32 = 5;
const W_ANALYSIS: u32 = 5;
const W_ACTION: u32 = 10;
const W_ORDER: u32 = 15;
const W_PACKAGES: u32 = 5;
const W_COVERAGE: u32 = 20;
const W_CONTENT: u32 = 15;
const W_CLEAR: u32 = 5;

/// A scored response together with what was extracted from it
#[derive(Debug, Clone)]
pub struct ScoredResponse {
    pub evaluation: EvaluationResult,
    pub plan: Option<GeneratedPlan>,
    pub report: ValidationReport,
}

/// Scores responses against the configured usability threshold
#[derive(Debug, Clone)]
pub struct ResponseEvaluator {
    validator: PlanValidator,
    threshold: u32,
}

impl Default for ResponseEvaluator {
    fn default() -> Self {
        Self::from_config(&PilotConfig::default())
    }
}

impl ResponseEvaluator {
    pub fn from_config(config: &PilotConfig) -> Self {
        Self {
            validator: PlanValidator::from_config(config),
            threshold: config.usability_threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Extract, validate and score a raw response
    pub fn evaluate(&self, text: &str) -> ScoredResponse {
        let outcome = extract_plan(text);
        let report = self.validator.validate_response(text, &outcome, None);

        let ExtractionOutcome::Extracted { plan, .. } = outcome else {
            let mut issues = vec!["No structured plan payload could be extracted".to_string()];
            issues.extend(report.issues.iter().map(|i| i.message.clone()));
            return ScoredResponse {
                evaluation: EvaluationResult {
                    score: 0,
                    is_usable: false,
                    issues,
                    missing_elements: vec!["a fenced JSON plan payload".to_string()],
                    strengths: Vec::new(),
                    suggestions: vec![
                        "Reply with exactly one ```json fenced block containing phase, analysis, plan, tasks and codeBlocks".to_string(),
                    ],
                },
                plan: None,
                report,
            };
        };

        let evaluation = self.score(&plan, &report);
        ScoredResponse {
            evaluation,
            plan: Some(plan),
            report,
        }
    }

    fn score(&self, plan: &GeneratedPlan, report: &ValidationReport) -> EvaluationResult {
        let mut score = W_PAYLOAD;
        let mut missing = Vec::new();
        let mut strengths = vec!["Structured payload present".to_string()];
        let mut suggestions = Vec::new();

        let mut award = |ok: bool, weight: u32, name: &str, score: &mut u32| {
            if ok {
                *score += weight;
                strengths.push(format!("{} present", name));
            } else {
                missing.push(name.to_string());
            }
        };

        award(plan.phase.is_some(), W_PHASE, "phase", &mut score);
        award(
            plan.analysis.as_deref().is_some_and(|a| !a.trim().is_empty()),
            W_ANALYSIS,
            "analysis",
            &mut score,
        );
        award(plan.action_type().is_some(), W_ACTION, "plan.actionType", &mut score);
        award(
            !report.has_kind(IssueKind::MissingExecutionOrder)
                && (plan.tasks.as_ref().is_some_and(|t| !t.is_empty())
                    || plan
                        .plan
                        .as_ref()
                        .and_then(|p| p.execution_order.as_ref())
                        .is_some_and(|o| !o.is_empty())),
            W_ORDER,
            "plan.executionOrder or tasks",
            &mut score,
        );
        award(
            !report.has_kind(IssueKind::MissingPackages),
            W_PACKAGES,
            "plan.packages",
            &mut score,
        );
        award(
            !report.has_kind(IssueKind::MissingCoverage)
                && !report.has_kind(IssueKind::DuplicateCoverage)
                && !report.has_kind(IssueKind::UncoveredCodeBlock)
                && !report.has_kind(IssueKind::InvalidPath),
            W_COVERAGE,
            "codeBlocks matching filesToCreate/filesToModify one-to-one",
            &mut score,
        );
        award(
            !report.has_kind(IssueKind::PlaceholderContent)
                && !report.has_kind(IssueKind::ContentTooShort),
            W_CONTENT,
            "complete file content without placeholders",
            &mut score,
        );
        award(
            !plan.needs_clarification(),
            W_CLEAR,
            "resolved questions",
            &mut score,
        );

        for issue in &report.issues {
            let suggestion = match issue.kind {
                IssueKind::MissingCoverage => issue
                    .path
                    .as_ref()
                    .map(|p| format!("Add a codeBlocks entry for {}", p)),
                IssueKind::PlaceholderContent | IssueKind::ContentTooShort => issue
                    .path
                    .as_ref()
                    .map(|p| format!("Write the complete content of {}", p)),
                IssueKind::BuildToolMismatch => {
                    Some("Use the same package manager in commands as in descriptions".to_string())
                }
                _ => None,
            };
            if let Some(s) = suggestion {
                if !suggestions.contains(&s) {
                    suggestions.push(s);
                }
            }
        }

        let score = score.min(100);
        EvaluationResult {
            score,
            is_usable: score >= self.threshold && report.is_valid(),
            issues: report.issues.iter().map(|i| i.message.clone()).collect(),
            missing_elements: missing,
            strengths,
            suggestions,
        }
    }
}
