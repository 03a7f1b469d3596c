//! Question Detection
//!
//! Finds what the model is still asking. Structured `questions` always win;
//! the prose outside fenced blocks is only scanned when the payload gives
//! nothing to execute.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::plan::GeneratedPlan;
use crate::services::extraction::find_fenced_blocks;

fn interrogative_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:[-*]|\d+[.)])?\s*(?:should|shall|would|could|can|do|does|did|which|what|where|how|is|are|will)\b[^?\n]{0,240}\?\s*$",
        )
        .ok()
    })
    .as_ref()
}

fn request_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:please\s+(?:confirm|clarify|specify)|let me know\s+(?:which|whether|if|what)|could you clarify)\b")
            .ok()
    })
    .as_ref()
}

/// Unresolved questions in a response, in the order they appear
pub fn detect_questions(plan: Option<&GeneratedPlan>, raw: &str) -> Vec<String> {
    if let Some(plan) = plan {
        if !plan.questions.is_empty() {
            return plan.questions.clone();
        }
        if plan.is_clear == Some(false) {
            let reason = plan
                .analysis
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or("The request was marked unclear without a question");
            return vec![reason.to_string()];
        }
        if has_actionable_content(plan) {
            return Vec::new();
        }
    }
    prose_questions(raw)
}

fn has_actionable_content(plan: &GeneratedPlan) -> bool {
    plan.tasks.as_ref().is_some_and(|t| !t.is_empty())
        || !plan.planned_paths().is_empty()
        || !plan.packages().is_empty()
        || plan
            .plan
            .as_ref()
            .and_then(|p| p.execution_order.as_ref())
            .is_some_and(|o| !o.is_empty())
}

/// Question-like lines of the text outside fenced blocks
fn prose_questions(raw: &str) -> Vec<String> {
    let (Some(interrogative), Some(request)) = (interrogative_regex(), request_regex()) else {
        return Vec::new();
    };

    let mut prose = String::with_capacity(raw.len());
    let mut cursor = 0;
    for block in find_fenced_blocks(raw) {
        prose.push_str(&raw[cursor..block.start]);
        prose.push('\n');
        cursor = block.end;
    }
    prose.push_str(&raw[cursor..]);

    prose
        .lines()
        .map(str::trim)
        .filter(|line| interrogative.is_match(line) || request.is_match(line))
        .map(|line| line.trim_start_matches(['-', '*', ' ']).to_string())
        .collect()
}
