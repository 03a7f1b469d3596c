//! Project Models
//!
//! Project types, the build tools that drive them, and detection results.

use serde::{Deserialize, Serialize};

/// Supported project types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Node.js/JavaScript/TypeScript project (package.json)
    NodeJs,
    /// Rust project (Cargo.toml)
    Rust,
    /// Python project (pyproject.toml, setup.py, requirements.txt)
    Python,
    /// Go project (go.mod)
    Go,
    /// Unknown/unsupported project type
    Unknown,
}

impl ProjectType {
    /// Package manager used when nothing more specific is detected
    pub fn default_build_tool(&self) -> Option<BuildTool> {
        match self {
            ProjectType::NodeJs => Some(BuildTool::Npm),
            ProjectType::Rust => Some(BuildTool::Cargo),
            ProjectType::Python => Some(BuildTool::Pip),
            ProjectType::Go => Some(BuildTool::Go),
            ProjectType::Unknown => None,
        }
    }

    /// Get human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::NodeJs => "Node.js",
            ProjectType::Rust => "Rust",
            ProjectType::Python => "Python",
            ProjectType::Go => "Go",
            ProjectType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Build Tools
// ============================================================================

/// Build tools and package managers the pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    Npm,
    Yarn,
    Pnpm,
    Bun,
    Cargo,
    Pip,
    Poetry,
    Go,
}

impl BuildTool {
    pub const ALL: [BuildTool; 8] = [
        BuildTool::Npm,
        BuildTool::Yarn,
        BuildTool::Pnpm,
        BuildTool::Bun,
        BuildTool::Cargo,
        BuildTool::Pip,
        BuildTool::Poetry,
        BuildTool::Go,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuildTool::Npm => "npm",
            BuildTool::Yarn => "yarn",
            BuildTool::Pnpm => "pnpm",
            BuildTool::Bun => "bun",
            BuildTool::Cargo => "cargo",
            BuildTool::Pip => "pip",
            BuildTool::Poetry => "poetry",
            BuildTool::Go => "go",
        }
    }

    /// Executable names that count as running this tool.
    pub fn executables(&self) -> &'static [&'static str] {
        match self {
            BuildTool::Npm => &["npm", "npx"],
            BuildTool::Yarn => &["yarn"],
            BuildTool::Pnpm => &["pnpm", "pnpx"],
            BuildTool::Bun => &["bun", "bunx"],
            BuildTool::Cargo => &["cargo"],
            BuildTool::Pip => &["pip", "pip3"],
            BuildTool::Poetry => &["poetry"],
            BuildTool::Go => &["go"],
        }
    }

    /// Project type this tool belongs to
    pub fn project_type(&self) -> ProjectType {
        match self {
            BuildTool::Npm | BuildTool::Yarn | BuildTool::Pnpm | BuildTool::Bun => {
                ProjectType::NodeJs
            }
            BuildTool::Cargo => ProjectType::Rust,
            BuildTool::Pip | BuildTool::Poetry => ProjectType::Python,
            BuildTool::Go => ProjectType::Go,
        }
    }

    /// Synthesize a single install command for `packages`.
    pub fn install_command(&self, packages: &[String]) -> String {
        let verb = match self {
            BuildTool::Npm => "npm install",
            BuildTool::Yarn => "yarn add",
            BuildTool::Pnpm => "pnpm add",
            BuildTool::Bun => "bun add",
            BuildTool::Cargo => "cargo add",
            BuildTool::Pip => "pip install",
            BuildTool::Poetry => "poetry add",
            BuildTool::Go => "go get",
        };
        if packages.is_empty() {
            verb.to_string()
        } else {
            format!("{} {}", verb, packages.join(" "))
        }
    }

    /// Build tools named in free text (task descriptions, analysis prose).
    ///
    /// "go" is a normal English word, so Go only counts when it is followed by
    /// one of its subcommands or written as "golang".
    pub fn mentioned_in(text: &str) -> Vec<BuildTool> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .filter(|t| !t.is_empty())
            .collect();

        let mut found = Vec::new();
        for tool in BuildTool::ALL {
            let hit = if tool == BuildTool::Go {
                tokens.iter().enumerate().any(|(i, t)| {
                    *t == "golang"
                        || (*t == "go"
                            && tokens.get(i + 1).map_or(false, |next| {
                                matches!(*next, "build" | "test" | "get" | "run" | "mod" | "install")
                            }))
                })
            } else {
                tokens
                    .iter()
                    .any(|t| tool.executables().contains(t) || *t == tool.name())
            };
            if hit {
                found.push(tool);
            }
        }
        found
    }

    /// Build tools actually invoked by a shell command line.
    ///
    /// Looks at the first word of every `&&`, `||`, `;` or `|` separated
    /// segment, skipping `sudo` and leading `VAR=value` assignments.
    pub fn invoked_by(command: &str) -> Vec<BuildTool> {
        let mut found = Vec::new();
        let segments = command
            .split("&&")
            .flat_map(|s| s.split("||"))
            .flat_map(|s| s.split(';'))
            .flat_map(|s| s.split('|'));

        for segment in segments {
            let program = segment
                .split_whitespace()
                .find(|word| *word != "sudo" && !word.contains('='));
            let Some(program) = program else { continue };
            let program = program.rsplit('/').next().unwrap_or(program);
            for tool in BuildTool::ALL {
                if tool.executables().contains(&program) && !found.contains(&tool) {
                    found.push(tool);
                }
            }
        }
        found
    }
}

impl std::fmt::Display for BuildTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Detection Results
// ============================================================================

/// Project metadata read from the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project name
    pub name: Option<String>,
    /// Project version
    pub version: Option<String>,
}

/// Project detection result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetectionResult {
    /// Detected project type
    pub project_type: ProjectType,
    /// Package manager / build tool, if one could be determined
    pub build_tool: Option<BuildTool>,
    /// Path to the marker file that was detected
    pub marker_file: Option<String>,
    /// Project metadata
    pub metadata: ProjectMetadata,
}

impl ProjectDetectionResult {
    pub fn unknown() -> Self {
        Self {
            project_type: ProjectType::Unknown,
            build_tool: None,
            marker_file: None,
            metadata: ProjectMetadata::default(),
        }
    }
}
