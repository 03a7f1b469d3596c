//! Generation Types
//!
//! Conversation history, per-call options, and the error type shared by every
//! generative collaborator.

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn of conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a simple text message
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }
}

/// Per-call generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    /// Override the collaborator's default temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_override: Option<f32>,
    /// Override the collaborator's default output budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_override: Option<u32>,
    /// Request a streamed response
    #[serde(default)]
    pub stream: bool,
}

impl GenerateOptions {
    pub fn streaming() -> Self {
        Self {
            stream: true,
            ..Default::default()
        }
    }
}

/// Error types for generation calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// The collaborator could not be reached at all
    Unreachable { message: String },
    /// The collaborator answered with an error
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// A scripted or metered collaborator has nothing left to give
    Exhausted { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        LlmError::Unreachable {
            message: message.into(),
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        LlmError::Exhausted {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        LlmError::Other {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Unreachable { message } => {
                write!(f, "Collaborator unreachable: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::Exhausted { message } => write!(f, "Exhausted: {}", message),
            LlmError::Other { message } => write!(f, "Error: {}", message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for generation calls
pub type LlmResult<T> = Result<T, LlmError>;
