//! Plan Extractor
//!
//! Recovers a `GeneratedPlan` from arbitrary model text. The search order is:
//!
//! 1. the last fenced structured block, else the raw text, scanned from its
//!    first opening brace
//! 2. for a balanced candidate: the repaired text, then the text as written
//! 3. from each opening brace of the whole text in turn, the balanced value
//!    or, when the text ends first, the largest balanced-so-far prefix that
//!    parses
//!
//! A parsed value only counts when it carries `phase`, `plan` or `tasks`.
//! Extraction never fails loudly: the worst case is `NotFound`.

use serde_json::Value;
use tracing::debug;

use super::fences::last_structured_block;
use super::repair::repair;
use super::scanner::{prefix_candidates, scan, ScanOutcome};
use crate::models::plan::GeneratedPlan;

/// Opening braces tried in the fallback pass
const MAX_START_POSITIONS: usize = 16;

/// Balanced-so-far prefixes tried per start position
const MAX_PREFIX_ATTEMPTS: usize = 64;

/// Where the payload was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    FencedBlock,
    RawText,
    /// A truncated value closed at its last complete element
    BalancedPrefix,
}

/// Result of an extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted {
        plan: GeneratedPlan,
        value: Value,
        source: ExtractionSource,
        /// Whether repair was needed for the payload to parse
        repaired: bool,
    },
    NotFound {
        reason: String,
    },
}

impl ExtractionOutcome {
    pub fn plan(&self) -> Option<&GeneratedPlan> {
        match self {
            ExtractionOutcome::Extracted { plan, .. } => Some(plan),
            ExtractionOutcome::NotFound { .. } => None,
        }
    }

    pub fn into_plan(self) -> Option<GeneratedPlan> {
        match self {
            ExtractionOutcome::Extracted { plan, .. } => Some(plan),
            ExtractionOutcome::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted { .. })
    }
}

/// Extract a plan payload from model text
pub fn extract_plan(text: &str) -> ExtractionOutcome {
    if !text.contains('{') {
        return ExtractionOutcome::NotFound {
            reason: "no opening brace in response".to_string(),
        };
    }

    // Pass 1: preferred region
    let (region, source) = match last_structured_block(text) {
        Some(block) => (block.body, ExtractionSource::FencedBlock),
        None => (text, ExtractionSource::RawText),
    };
    if let Some(start) = region.find('{') {
        if let ScanOutcome::Balanced(end) = scan(region, start) {
            if let Some((value, repaired)) = parse_candidate(&region[start..end]) {
                return found(value, source, repaired);
            }
        }
    }

    // Pass 2: every opening brace of the whole text
    for start in text
        .char_indices()
        .filter(|(_, c)| *c == '{')
        .map(|(i, _)| i)
        .take(MAX_START_POSITIONS)
    {
        match scan(text, start) {
            ScanOutcome::Balanced(end) => {
                if let Some((value, repaired)) = parse_candidate(&text[start..end]) {
                    return found(value, ExtractionSource::RawText, repaired);
                }
            }
            ScanOutcome::Unbalanced(points) => {
                for candidate in prefix_candidates(text, start, &points)
                    .into_iter()
                    .take(MAX_PREFIX_ATTEMPTS)
                {
                    if let Some((value, _)) = parse_candidate(&candidate) {
                        debug!(
                            start = start,
                            kept_chars = candidate.len(),
                            "Recovered truncated payload"
                        );
                        return found(value, ExtractionSource::BalancedPrefix, true);
                    }
                }
            }
        }
    }

    ExtractionOutcome::NotFound {
        reason: "no parseable payload carrying phase, plan or tasks".to_string(),
    }
}

/// Repaired first, then as written. Returns the value and whether repair was used.
fn parse_candidate(candidate: &str) -> Option<(Value, bool)> {
    let repaired = repair(candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        if GeneratedPlan::has_marker(&value) {
            return Some((value, repaired != candidate));
        }
    }
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if GeneratedPlan::has_marker(&value) => Some((value, false)),
        _ => None,
    }
}

fn found(value: Value, source: ExtractionSource, repaired: bool) -> ExtractionOutcome {
    debug!(source = ?source, repaired = repaired, "Extracted plan payload");
    ExtractionOutcome::Extracted {
        plan: GeneratedPlan::from_value(&value),
        value,
        source,
        repaired,
    }
}
