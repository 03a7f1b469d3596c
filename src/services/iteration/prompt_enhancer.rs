//! Prompt Enhancer
//!
//! Turns an evaluation into a follow-up prompt that names what was missing
//! and how to fix it. Under the low-quality floor the enhancement escalates
//! to restating the whole payload format.

use crate::models::evaluation::EvaluationResult;

/// Payload format restated when a response is far off
pub const SCHEMA_EXAMPLE: &str = r#"```json
{
  "phase": "execution",
  "analysis": "<what the request needs>",
  "isClear": true,
  "questions": [],
  "plan": {
    "actionType": "CREATE",
    "packages": ["<package>"],
    "filesToCreate": [{"path": "<relative/path.ext>", "purpose": "<why>"}],
    "filesToModify": [{"path": "<relative/path.ext>", "changes": "<what>", "fileExists": true}],
    "executionOrder": ["<step 1>", "<step 2>"]
  },
  "tasks": [{"id": "task-1", "type": "install", "description": "<step>", "dependencies": []}],
  "codeBlocks": [{"filePath": "<relative/path.ext>", "language": "<lang>", "content": "<complete file>"}]
}
```"#;

/// Build the prompt for the next iteration
pub fn enhance(
    base_prompt: &str,
    evaluation: &EvaluationResult,
    iteration: u32,
    low_quality_floor: u32,
) -> String {
    let mut out = String::with_capacity(base_prompt.len() + 1024);
    out.push_str(base_prompt.trim_end());
    out.push_str(&format!(
        "\n\n## Revision {} (previous score {}/100)\n",
        iteration, evaluation.score
    ));

    if !evaluation.missing_elements.is_empty() {
        out.push_str("\nThe previous response was missing:\n");
        for element in &evaluation.missing_elements {
            out.push_str(&format!("- {}\n", element));
        }
    }

    if !evaluation.issues.is_empty() {
        out.push_str("\nProblems found:\n");
        for issue in &evaluation.issues {
            out.push_str(&format!("- {}\n", issue));
        }
    }

    if !evaluation.suggestions.is_empty() {
        out.push_str("\nFix instructions:\n");
        for suggestion in &evaluation.suggestions {
            out.push_str(&format!("- {}\n", suggestion));
        }
    }

    if evaluation.score < low_quality_floor {
        out.push_str(
            "\nThe previous response did not follow the required format. \
             Respond with exactly one fenced JSON block in this shape and nothing else. \
             Every file in filesToCreate or filesToModify needs one codeBlocks entry \
             with its complete content, no placeholders:\n",
        );
        out.push_str(SCHEMA_EXAMPLE);
        out.push('\n');
    } else {
        out.push_str("\nKeep everything that was correct and return the full corrected payload.\n");
    }

    out
}
