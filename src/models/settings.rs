//! Settings Models
//!
//! Pipeline configuration stored in config.json.

use serde::{Deserialize, Serialize};

/// Pipeline configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Follow-up generations the clarification loop may issue
    pub max_clarification_depth: u32,
    /// Generations the feedback loop may issue
    pub max_iterations: u32,
    /// Score (0-100) at which a response is usable
    pub usability_threshold: u32,
    /// Below this score prompt enhancements escalate
    pub low_quality_floor: u32,
    /// Scores below this count towards the early-abort streak
    pub hard_floor: u32,
    /// Consecutive scores under `hard_floor` that abort the feedback loop
    pub max_low_score_streak: u32,
    /// Minimum non-whitespace characters per code block
    pub min_code_block_chars: usize,
    /// Pause between tasks, in milliseconds
    pub task_delay_ms: u64,
    /// Cap on files returned by find_files
    pub max_found_files: usize,
    /// Cap on files read by analyze_source
    pub max_analyzed_files: usize,
    /// Unstructured responses longer than this without a fenced block are rejected
    pub max_response_chars_without_block: usize,
    /// Shell command timeout, in seconds
    pub command_timeout_secs: u64,
    /// Request streamed generations
    pub stream: bool,
    /// Run the feedback loop on the first prompt of a session
    pub harden_initial_prompt: bool,
    /// Route clarification follow-ups through the feedback loop
    pub auto_answer: bool,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            max_clarification_depth: 5,
            max_iterations: 5,
            usability_threshold: 70,
            low_quality_floor: 40,
            hard_floor: 20,
            max_low_score_streak: 3,
            min_code_block_chars: 20,
            task_delay_ms: 250,
            max_found_files: 50,
            max_analyzed_files: 10,
            max_response_chars_without_block: 4000,
            command_timeout_secs: 300,
            stream: false,
            harden_initial_prompt: false,
            auto_answer: false,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PilotConfigUpdate {
    pub max_clarification_depth: Option<u32>,
    pub max_iterations: Option<u32>,
    pub usability_threshold: Option<u32>,
    pub low_quality_floor: Option<u32>,
    pub hard_floor: Option<u32>,
    pub max_low_score_streak: Option<u32>,
    pub min_code_block_chars: Option<usize>,
    pub task_delay_ms: Option<u64>,
    pub max_found_files: Option<usize>,
    pub max_analyzed_files: Option<usize>,
    pub max_response_chars_without_block: Option<usize>,
    pub command_timeout_secs: Option<u64>,
    pub stream: Option<bool>,
    pub harden_initial_prompt: Option<bool>,
    pub auto_answer: Option<bool>,
}

impl PilotConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: PilotConfigUpdate) {
        if let Some(depth) = update.max_clarification_depth {
            self.max_clarification_depth = depth;
        }
        if let Some(max) = update.max_iterations {
            self.max_iterations = max;
        }
        if let Some(threshold) = update.usability_threshold {
            self.usability_threshold = threshold;
        }
        if let Some(floor) = update.low_quality_floor {
            self.low_quality_floor = floor;
        }
        if let Some(floor) = update.hard_floor {
            self.hard_floor = floor;
        }
        if let Some(streak) = update.max_low_score_streak {
            self.max_low_score_streak = streak;
        }
        if let Some(chars) = update.min_code_block_chars {
            self.min_code_block_chars = chars;
        }
        if let Some(delay) = update.task_delay_ms {
            self.task_delay_ms = delay;
        }
        if let Some(max) = update.max_found_files {
            self.max_found_files = max;
        }
        if let Some(max) = update.max_analyzed_files {
            self.max_analyzed_files = max;
        }
        if let Some(max) = update.max_response_chars_without_block {
            self.max_response_chars_without_block = max;
        }
        if let Some(timeout) = update.command_timeout_secs {
            self.command_timeout_secs = timeout;
        }
        if let Some(stream) = update.stream {
            self.stream = stream;
        }
        if let Some(harden) = update.harden_initial_prompt {
            self.harden_initial_prompt = harden;
        }
        if let Some(auto) = update.auto_answer {
            self.auto_answer = auto;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_clarification_depth == 0 {
            return Err("max_clarification_depth must be at least 1".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        if self.usability_threshold > 100 {
            return Err(format!(
                "Invalid usability_threshold: {}. Must be between 0 and 100",
                self.usability_threshold
            ));
        }
        // Floors must be ordered: hard <= low-quality <= usable
        if self.low_quality_floor > self.usability_threshold {
            return Err("low_quality_floor cannot exceed usability_threshold".to_string());
        }
        if self.hard_floor > self.low_quality_floor {
            return Err("hard_floor cannot exceed low_quality_floor".to_string());
        }
        if self.max_low_score_streak == 0 {
            return Err("max_low_score_streak must be at least 1".to_string());
        }
        if self.max_found_files == 0 || self.max_analyzed_files == 0 {
            return Err("File caps must be at least 1".to_string());
        }
        if self.command_timeout_secs == 0 {
            return Err("command_timeout_secs must be at least 1 second".to_string());
        }
        Ok(())
    }
}
