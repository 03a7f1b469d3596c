//! JSON Configuration Management
//!
//! Reads and writes the pipeline configuration file, by default
//! `~/.plan-pilot/config.json`. A missing file is created with defaults.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::settings::{PilotConfig, PilotConfigUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for the pipeline settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: PilotConfig,
}

impl ConfigService {
    /// Open the default config file
    pub fn new() -> AppResult<Self> {
        Self::open(config_path()?)
    }

    /// Open a config file at an explicit path, creating defaults if absent
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config");
            Self::load_from_file(&config_path)?
        } else {
            info!(path = %config_path.display(), "Creating default config");
            let default_config = PilotConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<PilotConfig> {
        let content = fs::read_to_string(path)?;
        let config: PilotConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &PilotConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Update the configuration with a partial update.
    ///
    /// An update that fails validation leaves both memory and disk untouched.
    pub fn update_config(&mut self, update: PilotConfigUpdate) -> AppResult<PilotConfig> {
        let mut candidate = self.config.clone();
        candidate.apply_update(update);
        Self::save_to_file(&self.config_path, &candidate)?;
        self.config = candidate;
        Ok(self.config.clone())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = PilotConfig::default();
        Self::save_to_file(&self.config_path, &self.config)
    }
}
