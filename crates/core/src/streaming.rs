//! Generation Stream Events
//!
//! Events a streaming generative collaborator emits while a response is being
//! produced. Every stream ends with exactly one terminal event (`Complete` or
//! `Error`); a channel that closes without one was cut off.

use serde::{Deserialize, Serialize};

/// A single event on a generation stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },

    /// Error during streaming
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl GenerationEvent {
    pub fn text(content: impl Into<String>) -> Self {
        GenerationEvent::TextDelta {
            content: content.into(),
        }
    }

    pub fn complete() -> Self {
        GenerationEvent::Complete { stop_reason: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        GenerationEvent::Error {
            message: message.into(),
            code: None,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Complete { .. } | GenerationEvent::Error { .. }
        )
    }
}
