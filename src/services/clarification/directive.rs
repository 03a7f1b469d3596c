//! Clarification Directives
//!
//! Follow-up instructions sent to the model when a round cannot proceed.
//! Every directive tells the model to settle the matter itself with what is
//! already known and to come back with a complete plan.

use crate::models::workflow::ClarificationRequest;
use crate::services::validation::ValidationReport;

/// Why a round stopped short of a finished workflow
#[derive(Debug, Clone)]
pub enum ClarificationTrigger {
    /// The model asked questions instead of planning
    Questions(Vec<String>),
    /// The plan failed validation
    Validation(ValidationReport),
    /// The plan could not be compiled into tasks
    Compile(String),
    /// Tasks raised clarification requests while running
    Execution(Vec<ClarificationRequest>),
}

impl ClarificationTrigger {
    pub fn kind(&self) -> &'static str {
        match self {
            ClarificationTrigger::Questions(_) => "questions",
            ClarificationTrigger::Validation(_) => "validation",
            ClarificationTrigger::Compile(_) => "compile",
            ClarificationTrigger::Execution(_) => "execution",
        }
    }

    /// One-line description for logs and records
    pub fn describe(&self) -> String {
        match self {
            ClarificationTrigger::Questions(q) => format!("{} open question(s)", q.len()),
            ClarificationTrigger::Validation(r) => format!("{} validation issue(s)", r.issues.len()),
            ClarificationTrigger::Compile(e) => format!("compile failure: {}", e),
            ClarificationTrigger::Execution(c) => format!("{} clarification request(s) from tasks", c.len()),
        }
    }
}

/// What the model should already know when resolving a trigger
#[derive(Debug, Clone, Default)]
pub struct DirectiveContext<'a> {
    pub original_request: &'a str,
    /// Files read or located so far
    pub known_files: &'a [String],
    /// Descriptions of tasks that already completed
    pub completed: &'a [String],
}

/// Build the follow-up prompt for a trigger
pub fn build_directive(trigger: &ClarificationTrigger, context: &DirectiveContext<'_>) -> String {
    let mut out = String::new();

    match trigger {
        ClarificationTrigger::Questions(questions) => {
            out.push_str("You asked the following instead of producing a plan:\n");
            for q in questions {
                out.push_str(&format!("- {}\n", q));
            }
            out.push_str(
                "\nAnswer them yourself. Pick the most reasonable option given the project and the request, \
                 record your assumptions in `analysis`, set `isClear` to true and `questions` to [].\n",
            );
        }
        ClarificationTrigger::Validation(report) => {
            out.push_str("Your previous plan could not be accepted:\n");
            out.push_str(&report.summary());
            out.push_str("\n\nFix every item above.\n");
        }
        ClarificationTrigger::Compile(error) => {
            out.push_str(&format!(
                "Your previous plan could not be turned into tasks: {}\n\
                 Make sure every task has a unique id and dependencies only name earlier tasks without cycles.\n",
                error
            ));
        }
        ClarificationTrigger::Execution(requests) => {
            out.push_str("Executing your plan stopped on the following:\n");
            for request in requests {
                write_request(&mut out, request);
            }
            out.push_str(
                "\nDecide each case yourself: modify an existing file instead of recreating it, \
                 use one of the suggested alternative paths, fix what made a command fail, or drop the step.\n",
            );
        }
    }

    if !context.completed.is_empty() {
        out.push_str("\nAlready done, do not repeat:\n");
        for step in context.completed {
            out.push_str(&format!("- {}\n", step));
        }
    }

    if !context.known_files.is_empty() {
        out.push_str("\nFiles already examined:\n");
        for file in context.known_files {
            out.push_str(&format!("- {}\n", file));
        }
    }

    if !context.original_request.trim().is_empty() {
        out.push_str(&format!("\nOriginal request: {}\n", context.original_request.trim()));
    }

    out.push_str(
        "\nDo not ask further questions. Reply with one fenced JSON plan covering the remaining work, \
         with a complete codeBlocks entry for every file you create or modify.",
    );
    out
}

fn write_request(out: &mut String, request: &ClarificationRequest) {
    out.push_str(&format!("- {}: {}\n", request.target_path, request.prompt_text));
    if request.file_exists == Some(true) {
        out.push_str("  The file already exists.\n");
        if let Some(preview) = &request.preview {
            out.push_str("  Current beginning of the file:\n");
            for line in preview.lines() {
                out.push_str(&format!("    {}\n", line));
            }
        }
    }
    if let Some(failure) = &request.failure_context {
        out.push_str(&format!(
            "  {} failed ({}): {}\n",
            failure.operation, failure.error_type, failure.error_message
        ));
        for suggestion in &failure.suggestions {
            out.push_str(&format!("  Suggestion: {}\n", suggestion));
        }
    }
    if !request.alternatives.is_empty() {
        out.push_str(&format!("  Options: {}\n", request.alternatives.join("; ")));
    }
}
