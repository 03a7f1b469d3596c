//! Best-Effort Inference
//!
//! Everything the pipeline guesses from free text sits behind one trait:
//! package names, file paths, shell commands, task types, and code blocks
//! embedded in prose. Callers only fall back to it after the structured
//! payload came up empty, so the guesses lean towards returning nothing.

use std::sync::OnceLock;

use regex::Regex;

use super::extraction::fences::find_fenced_blocks;
use crate::models::plan::TaskType;
use crate::utils::paths::{extension_of, normalize_path};

/// Guesses made from unstructured model text
pub trait BestEffortInference: Send + Sync {
    /// Package names named by install commands in `text`
    fn infer_packages(&self, text: &str) -> Vec<String>;

    /// Relative file paths mentioned in `text`, normalized and deduplicated
    fn infer_paths(&self, text: &str) -> Vec<String>;

    /// A shell command implied by a task description
    fn infer_command(&self, description: &str) -> Option<String>;

    /// Task type implied by a step description
    fn infer_task_type(&self, description: &str) -> TaskType;

    /// Content of a fenced block in `text` that belongs to `path`
    fn find_embedded_block(&self, text: &str, path: &str) -> Option<String>;
}

/// Regex and keyword based inference
#[derive(Debug, Clone, Default)]
pub struct HeuristicInference;

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn install_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)\b(?:npm\s+(?:install|i|add)|yarn\s+add|pnpm\s+(?:add|install|i)|bun\s+(?:add|install)|pip3?\s+install|cargo\s+add|poetry\s+add|go\s+get)\s+([^\n`;&|]+)",
    )
}

fn path_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r#"(?:^|[\s`'"(\[])((?:\.{0,2}/)?(?:[\w@\[\]().-]+/)*[\w@\[\].-]*\w\.(?:tsx|ts|jsx|js|mjs|cjs|json|css|scss|html|md|mdx|rs|py|go|toml|yaml|yml|vue|svelte|sh|txt|env|sql|prisma))\b"#,
    )
}

fn backtick_command_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"`([^`\n]+)`")
}

fn run_phrase_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)\b(?:run|execute)\s+((?:npm|npx|yarn|pnpm|bun|cargo|go|make|python3?|pip3?|node|poetry)\b[^\n.;,]*)",
    )
}

/// Programs a backticked snippet must start with to count as a command
const COMMAND_PROGRAMS: &[&str] = &[
    "npm", "npx", "yarn", "pnpm", "pnpx", "bun", "bunx", "cargo", "go", "make", "python",
    "python3", "pip", "pip3", "poetry", "node", "git", "mkdir", "touch", "cp", "mv", "rm",
    "docker", "tsc", "deno",
];

impl BestEffortInference for HeuristicInference {
    fn infer_packages(&self, text: &str) -> Vec<String> {
        let Some(re) = install_regex() else {
            return Vec::new();
        };
        let mut packages: Vec<String> = Vec::new();
        for caps in re.captures_iter(text) {
            let Some(args) = caps.get(1) else { continue };
            for token in args.as_str().split_whitespace() {
                let name = token.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | ',' | ')' | '('));
                let name = name.trim_end_matches(['.', ':']);
                if name.is_empty()
                    || name.starts_with('-')
                    || name.eq_ignore_ascii_case("undefined")
                    || name.eq_ignore_ascii_case("and")
                {
                    continue;
                }
                if !packages.iter().any(|p| p == name) {
                    packages.push(name.to_string());
                }
            }
        }
        packages
    }

    fn infer_paths(&self, text: &str) -> Vec<String> {
        let Some(re) = path_regex() else {
            return Vec::new();
        };
        let mut paths: Vec<String> = Vec::new();
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let path = normalize_path(m.as_str());
            if path.is_empty() || path.contains("://") {
                continue;
            }
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    fn infer_command(&self, description: &str) -> Option<String> {
        if let Some(re) = backtick_command_regex() {
            for caps in re.captures_iter(description) {
                let snippet = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                let program = snippet.split_whitespace().next().unwrap_or("");
                if COMMAND_PROGRAMS.contains(&program) {
                    return Some(snippet.to_string());
                }
            }
        }

        run_phrase_regex()
            .and_then(|re| re.captures(description))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|cmd| !cmd.is_empty())
    }

    fn infer_task_type(&self, description: &str) -> TaskType {
        let lower = description.to_lowercase();
        let has = |words: &[&str]| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| words.contains(&w))
        };

        if has(&["install", "dependency", "dependencies", "package", "packages"]) {
            TaskType::Install
        } else if has(&["find", "locate", "search", "discover"]) {
            TaskType::FindFiles
        } else if has(&["analyze", "analyse", "review", "inspect", "read", "understand"]) {
            TaskType::AnalyzeSource
        } else if has(&["compare", "diff"]) {
            TaskType::Compare
        } else if has(&["verify", "validate", "check", "confirm"]) {
            TaskType::Verify
        } else if has(&["create", "add", "new", "scaffold", "generate", "write"]) {
            TaskType::Create
        } else if has(&["modify", "update", "edit", "change", "refactor", "fix", "replace"]) {
            TaskType::Modify
        } else if has(&["run", "execute", "build", "start", "test", "launch"]) {
            TaskType::Command
        } else {
            TaskType::Info
        }
    }

    fn find_embedded_block(&self, text: &str, path: &str) -> Option<String> {
        let wanted = normalize_path(path);
        let file_name = wanted.rsplit('/').next().unwrap_or(&wanted).to_string();
        let wanted_ext = extension_of(&wanted);

        let blocks: Vec<_> = find_fenced_blocks(text)
            .into_iter()
            .filter(|b| !b.is_structured() || wanted_ext.as_deref() == Some("json"))
            .collect();

        // A block introduced by, or opening with, a mention of the path
        for block in &blocks {
            let lead_start = text[..block.start]
                .rfind('\n')
                .map(|i| text[..i].rfind('\n').map_or(0, |j| j + 1))
                .unwrap_or(0);
            let lead = &text[lead_start..block.start];
            let first_line = block.body.trim_start_matches(['\r', '\n']).lines().next().unwrap_or("");
            if lead.contains(&wanted) || first_line.contains(&wanted) {
                return Some(block_content(block.body));
            }
        }

        // A lone block whose language matches the file
        let matching: Vec<_> = blocks
            .iter()
            .filter(|b| match (&b.lang, &wanted_ext) {
                (Some(lang), Some(ext)) => lang_matches(lang, ext),
                _ => false,
            })
            .collect();
        if matching.len() == 1 && !file_name.is_empty() {
            return Some(block_content(matching[0].body));
        }
        None
    }
}

fn block_content(body: &str) -> String {
    let trimmed = body.trim_start_matches([' ', '\t']);
    let trimmed = trimmed.strip_prefix("\r\n").or_else(|| trimmed.strip_prefix('\n')).unwrap_or(trimmed);
    let mut content = trimmed.trim_end().to_string();
    content.push('\n');
    content
}

fn lang_matches(lang: &str, ext: &str) -> bool {
    match ext {
        "ts" => matches!(lang, "ts" | "typescript"),
        "tsx" => matches!(lang, "tsx" | "typescript" | "typescriptreact"),
        "js" | "mjs" | "cjs" => matches!(lang, "js" | "javascript"),
        "jsx" => matches!(lang, "jsx" | "javascript"),
        "rs" => matches!(lang, "rs" | "rust"),
        "py" => matches!(lang, "py" | "python"),
        "yml" | "yaml" => matches!(lang, "yml" | "yaml"),
        "md" | "mdx" => matches!(lang, "md" | "markdown" | "mdx"),
        "sh" => matches!(lang, "sh" | "bash" | "shell"),
        other => lang == other,
    }
}
