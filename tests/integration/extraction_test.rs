//! Extraction Integration Tests
//!
//! Recovery of plan payloads from messy model text.

use plan_pilot::models::plan::{ActionType, Phase};
use plan_pilot::services::extraction::{extract_plan, ExtractionOutcome, ExtractionSource};

const STRICT: &str = r#"{
  "phase": "execution",
  "analysis": "Add a page",
  "plan": {"actionType": "CREATE", "packages": ["zod"], "executionOrder": ["install zod", "create page"]}
}"#;

const SLOPPY: &str = r#"{
  'phase': 'execution', // the model likes comments
  'analysis': 'Add a page',
  'plan': {'actionType': 'CREATE', 'packages': ['zod',], 'executionOrder': ['install zod', 'create page',],},
}"#;

#[test]
fn test_extraction_is_idempotent() {
    let text = format!("Plan below.\n```json\n{}\n```\nDone.", SLOPPY);
    let first = extract_plan(&text);
    let second = extract_plan(&text);
    assert_eq!(first, second);
    assert!(first.is_found());
}

#[test]
fn test_tolerant_syntax_equals_strict_json() {
    let strict = extract_plan(&format!("```json\n{}\n```", STRICT)).into_plan().unwrap();
    let sloppy = extract_plan(&format!("```json\n{}\n```", SLOPPY)).into_plan().unwrap();
    assert_eq!(strict, sloppy);
    assert_eq!(sloppy.action_type(), Some(ActionType::Create));
    assert_eq!(sloppy.packages(), &["zod".to_string()]);
}

#[test]
fn test_truncated_response_is_safe() {
    let full = format!("```json\n{}\n```", STRICT);
    // Every prefix either extracts something or reports nothing; none panics
    for cut in (0..full.len()).filter(|i| full.is_char_boundary(*i)) {
        let outcome = extract_plan(&full[..cut]);
        if let ExtractionOutcome::Extracted { plan, .. } = outcome {
            assert!(plan.phase.is_none() || plan.phase == Some(Phase::Execution));
        }
    }
}

#[test]
fn test_truncated_inside_plan_keeps_complete_fields() {
    let text = "```json\n{\"phase\": \"execution\", \"analysis\": \"Add a page\", \"plan\": {\"actionType\": \"CREATE\", \"executionOrder\": [\"install zod\", \"crea";
    match extract_plan(text) {
        ExtractionOutcome::Extracted { plan, source, .. } => {
            assert_eq!(source, ExtractionSource::BalancedPrefix);
            assert_eq!(plan.phase, Some(Phase::Execution));
            assert_eq!(plan.analysis.as_deref(), Some("Add a page"));
        }
        other => panic!("expected a recovered prefix, got {:?}", other),
    }
}

#[test]
fn test_prose_only_is_not_found() {
    let outcome = extract_plan("I think you should create a page called hello. Want me to?");
    assert!(matches!(outcome, ExtractionOutcome::NotFound { .. }));
}

#[test]
fn test_payload_after_unrelated_json() {
    let text = "Config example: ```json\n{\"name\": \"demo\"}\n```\nPlan: {\"phase\": \"planning\", \"isClear\": false, \"questions\": [\"Which router?\"]}";
    let plan = extract_plan(text).into_plan().unwrap();
    assert_eq!(plan.phase, Some(Phase::Planning));
    assert_eq!(plan.questions, vec!["Which router?".to_string()]);
}
