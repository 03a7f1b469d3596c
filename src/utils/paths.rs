//! Path Utilities
//!
//! Application directories (~/.plan-pilot/) and normalization of the relative
//! paths a model writes into plans.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Plan Pilot directory (~/.plan-pilot/)
pub fn plan_pilot_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".plan-pilot"))
}

/// Get the config file path (~/.plan-pilot/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(plan_pilot_dir()?.join("config.json"))
}

/// Get the database file path (~/.plan-pilot/records.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(plan_pilot_dir()?.join("records.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

// ============================================================================
// Plan Paths
// ============================================================================

/// Normalize a path written by a model into a project-relative path.
///
/// Backslashes become forward slashes, repeated separators collapse, and
/// leading `./` and `/` are stripped.
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.trim().trim_matches('`').replace('\\', "/");
    let mut rest = unified.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }

    rest.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a normalized path climbs out of its root
pub fn has_traversal(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// File extension of a normalized path, lowercased
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
