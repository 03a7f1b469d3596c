//! Project Type Detection
//!
//! Detects the project type by looking for marker files (package.json,
//! Cargo.toml, pyproject.toml, go.mod) and narrows the package manager down
//! with lockfiles and manifest hints.

use std::path::{Path, PathBuf};

use plan_pilot_core::{CoreError, CoreResult};
use tracing::debug;

use crate::models::{BuildTool, ProjectDetectionResult, ProjectMetadata, ProjectType};

/// Project type detector
pub struct ProjectDetector {
    /// Project root path
    project_path: PathBuf,
}

impl ProjectDetector {
    /// Create a new project detector for the given path
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Detect the project type and package manager
    pub fn detect(&self) -> CoreResult<ProjectDetectionResult> {
        let detections = [
            (ProjectType::Rust, "Cargo.toml"),
            (ProjectType::NodeJs, "package.json"),
            (ProjectType::Python, "pyproject.toml"),
            (ProjectType::Python, "setup.py"),
            (ProjectType::Python, "requirements.txt"),
            (ProjectType::Go, "go.mod"),
        ];

        for (project_type, marker) in detections {
            let marker_path = self.project_path.join(marker);
            if marker_path.exists() {
                let metadata = self.extract_metadata(project_type, &marker_path)?;
                let build_tool = self.detect_build_tool(project_type, &marker_path);
                debug!(
                    project_type = %project_type,
                    build_tool = ?build_tool,
                    marker = marker,
                    "Detected project"
                );

                return Ok(ProjectDetectionResult {
                    project_type,
                    build_tool,
                    marker_file: Some(marker_path.to_string_lossy().into_owned()),
                    metadata,
                });
            }
        }

        Ok(ProjectDetectionResult::unknown())
    }

    /// Pick the package manager for a detected project type
    fn detect_build_tool(&self, project_type: ProjectType, marker_path: &Path) -> Option<BuildTool> {
        match project_type {
            ProjectType::NodeJs => Some(self.detect_node_package_manager(marker_path)),
            ProjectType::Python => {
                let is_poetry = marker_path
                    .file_name()
                    .map_or(false, |n| n == "pyproject.toml")
                    && std::fs::read_to_string(marker_path)
                        .ok()
                        .and_then(|c| c.parse::<toml::Value>().ok())
                        .and_then(|t| t.get("tool").and_then(|t| t.get("poetry")).cloned())
                        .is_some();
                if is_poetry || self.project_path.join("poetry.lock").exists() {
                    Some(BuildTool::Poetry)
                } else {
                    Some(BuildTool::Pip)
                }
            }
            other => other.default_build_tool(),
        }
    }

    fn detect_node_package_manager(&self, package_json: &Path) -> BuildTool {
        // "packageManager": "pnpm@8.15.0" wins over lockfiles
        let declared = std::fs::read_to_string(package_json)
            .ok()
            .and_then(|c| serde_json::from_str::<serde_json::Value>(&c).ok())
            .and_then(|json| {
                json.get("packageManager")
                    .and_then(|v| v.as_str())
                    .map(|s| s.split('@').next().unwrap_or("").to_string())
            });
        match declared.as_deref() {
            Some("yarn") => return BuildTool::Yarn,
            Some("pnpm") => return BuildTool::Pnpm,
            Some("bun") => return BuildTool::Bun,
            Some("npm") => return BuildTool::Npm,
            _ => {}
        }

        let lockfiles = [
            ("pnpm-lock.yaml", BuildTool::Pnpm),
            ("yarn.lock", BuildTool::Yarn),
            ("bun.lockb", BuildTool::Bun),
            ("bun.lock", BuildTool::Bun),
        ];
        lockfiles
            .iter()
            .find(|(file, _)| self.project_path.join(file).exists())
            .map(|(_, tool)| *tool)
            .unwrap_or(BuildTool::Npm)
    }

    /// Extract metadata from the project configuration file
    fn extract_metadata(
        &self,
        project_type: ProjectType,
        marker_path: &Path,
    ) -> CoreResult<ProjectMetadata> {
        match project_type {
            ProjectType::NodeJs => {
                let content = std::fs::read_to_string(marker_path)?;
                let json: serde_json::Value = serde_json::from_str(&content)
                    .map_err(|e| CoreError::parse(format!("Failed to parse package.json: {}", e)))?;
                Ok(ProjectMetadata {
                    name: json.get("name").and_then(|v| v.as_str()).map(String::from),
                    version: json.get("version").and_then(|v| v.as_str()).map(String::from),
                })
            }
            ProjectType::Rust => {
                let toml = read_toml(marker_path, "Cargo.toml")?;
                let package = toml.get("package");
                Ok(ProjectMetadata {
                    name: package
                        .and_then(|p| p.get("name"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    version: package
                        .and_then(|p| p.get("version"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                })
            }
            ProjectType::Python => {
                if marker_path.file_name().map_or(true, |n| n != "pyproject.toml") {
                    return Ok(ProjectMetadata::default());
                }
                let toml = read_toml(marker_path, "pyproject.toml")?;
                let table = toml
                    .get("project")
                    .or_else(|| toml.get("tool").and_then(|t| t.get("poetry")));
                Ok(ProjectMetadata {
                    name: table
                        .and_then(|p| p.get("name"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    version: table
                        .and_then(|p| p.get("version"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                })
            }
            ProjectType::Go => {
                let content = std::fs::read_to_string(marker_path)?;
                let name = content
                    .lines()
                    .find(|l| l.starts_with("module "))
                    .map(|l| l.trim_start_matches("module ").trim().to_string());
                Ok(ProjectMetadata {
                    name,
                    version: None,
                })
            }
            ProjectType::Unknown => Ok(ProjectMetadata::default()),
        }
    }
}

fn read_toml(path: &Path, label: &str) -> CoreResult<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse()
        .map_err(|e| CoreError::parse(format!("Failed to parse {}: {}", label, e)))
}

/// Convenience function to detect project type
pub fn detect_project_type(path: impl AsRef<Path>) -> CoreResult<ProjectDetectionResult> {
    ProjectDetector::new(path).detect()
}
