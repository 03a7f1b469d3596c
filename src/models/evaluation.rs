//! Evaluation Models
//!
//! Scores produced by the feedback loop and the history it keeps.

use serde::{Deserialize, Serialize};

/// Quality assessment of one model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// 0-100
    pub score: u32,
    pub is_usable: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// One generate/score round of the feedback loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    /// 1-based
    pub iteration: u32,
    pub prompt: String,
    pub response: String,
    pub evaluation: EvaluationResult,
    /// Whether a structured payload was recovered from the response
    pub extracted: bool,
    pub duration_ms: u64,
}

/// Why the feedback loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A response reached the usability threshold
    Usable,
    /// Ran out of iterations
    MaxIterations,
    /// Too many consecutive scores under the hard floor
    LowScoreAbort,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Usable => write!(f, "usable response reached"),
            StopReason::MaxIterations => write!(f, "maximum iterations reached"),
            StopReason::LowScoreAbort => write!(f, "aborted after repeated very low scores"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Full result of a feedback loop run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub stop_reason: StopReason,
    pub history: Vec<IterationRecord>,
}

impl FeedbackOutcome {
    pub fn success(&self) -> bool {
        self.stop_reason == StopReason::Usable
    }

    /// The iteration that reached the threshold, or the best-scoring one
    pub fn best(&self) -> Option<&IterationRecord> {
        if self.success() {
            return self.history.last();
        }
        self.history
            .iter()
            .rev()
            .max_by_key(|r| r.evaluation.score)
    }

    pub fn final_score(&self) -> Option<u32> {
        self.history.last().map(|r| r.evaluation.score)
    }
}
