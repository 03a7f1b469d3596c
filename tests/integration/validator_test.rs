//! Validator Integration Tests
//!
//! Coverage, content and existence checks over extracted plans.

use std::collections::HashSet;
use std::fs;

use plan_pilot::services::extraction::extract_plan;
use plan_pilot::services::validation::{IssueKind, PlanValidator, ProjectTreeOracle};

fn validate(text: &str) -> plan_pilot::services::validation::ValidationReport {
    let outcome = extract_plan(text);
    PlanValidator::default().validate_response(text, &outcome, None)
}

#[test]
fn test_missing_code_block_names_the_file() {
    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "CREATE",
  "filesToCreate": [{"path": "a.ts"}, {"path": "src/b.ts"}],
  "executionOrder": ["create both files"]},
 "codeBlocks": [{"filePath": "./src/b.ts", "content": "export const b = 'complete content';"}]}
```"#;
    let report = validate(text);
    let coverage: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::MissingCoverage)
        .collect();
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].path.as_deref(), Some("a.ts"));
    assert!(coverage[0].message.contains("a.ts"));
}

#[test]
fn test_placeholder_and_short_blocks_rejected() {
    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "MODIFY",
  "filesToModify": [{"path": "src/app.ts"}, {"path": "src/util.ts"}],
  "executionOrder": ["update files"]},
 "codeBlocks": [
   {"filePath": "src/app.ts", "content": "// ... existing code ...\nexport const x = 1;"},
   {"filePath": "src/util.ts", "content": "x"}
 ]}
```"#;
    let report = validate(text);
    assert!(report.has_kind(IssueKind::PlaceholderContent));
    assert!(report.has_kind(IssueKind::ContentTooShort));
    assert!(!report.is_valid());
}

#[test]
fn test_install_without_packages() {
    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "ADD", "packages": [],
  "executionOrder": ["install the date library", "use it"]}}
```"#;
    assert!(validate(text).has_kind(IssueKind::MissingPackages));
}

#[test]
fn test_suspicious_paths() {
    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "CREATE",
  "filesToCreate": [{"path": "../outside.ts"}, {"path": "src/*.ts"}, {"path": "a"}],
  "executionOrder": ["create"]}}
```"#;
    let report = validate(text);
    let invalid = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::InvalidPath)
        .count();
    assert_eq!(invalid, 3);
}

#[test]
fn test_existence_oracle_raises_questions() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), "{\"name\": \"demo\"}").unwrap();

    let text = r#"```json
{"phase": "execution", "plan": {"actionType": "CREATE",
  "filesToCreate": [{"path": "package.json"}],
  "filesToModify": [{"path": "src/missing.ts"}],
  "executionOrder": ["write files"]},
 "codeBlocks": [
   {"filePath": "package.json", "content": "{\n  \"name\": \"demo\",\n  \"private\": true\n}"},
   {"filePath": "src/missing.ts", "content": "export const missing = true;"}
 ]}
```"#;
    let outcome = extract_plan(text);
    let oracle = ProjectTreeOracle::new(dir.path());
    let report = PlanValidator::default().validate_response(text, &outcome, Some(&oracle));

    assert!(report.is_valid());
    assert_eq!(report.questions.len(), 2);
    assert!(report.questions[0].starts_with("package.json already exists"));
    assert!(report.questions[1].starts_with("src/missing.ts does not exist"));

    let known: HashSet<String> = ["src/missing.ts".to_string()].into_iter().collect();
    let report = PlanValidator::default().validate_response(text, &outcome, Some(&known));
    assert!(report.is_clean());
}

#[test]
fn test_long_prose_without_block_is_not_structured() {
    let text = "word ".repeat(1200);
    assert!(validate(&text).has_kind(IssueKind::NotStructured));
    assert!(validate("Sure, happy to help.").is_clean());
}
