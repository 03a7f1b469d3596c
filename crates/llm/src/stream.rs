//! Stream Assembly
//!
//! Collects a generation event stream into one buffer before anything downstream
//! looks at it. A stream that stops without a terminal event, or ends in an
//! error after some text arrived, still yields the partial buffer.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::provider::GenerativeCollaborator;
use crate::types::{GenerateOptions, LlmResult, Message};
use plan_pilot_core::streaming::GenerationEvent;

const STREAM_BUFFER: usize = 64;

/// Text assembled from a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledText {
    /// Concatenated text deltas
    pub text: String,
    /// Whether the stream ended with an explicit `Complete`
    pub complete: bool,
    /// Error reported by the stream, if any
    pub error: Option<String>,
}

impl AssembledText {
    /// True when the buffer is only a best-effort partial response
    pub fn is_partial(&self) -> bool {
        !self.complete
    }
}

/// Drain `rx` until a terminal event or until every sender is dropped.
pub async fn assemble(mut rx: mpsc::Receiver<GenerationEvent>) -> AssembledText {
    let mut assembled = AssembledText::default();
    while let Some(event) = rx.recv().await {
        match event {
            GenerationEvent::TextDelta { content } => assembled.text.push_str(&content),
            GenerationEvent::Complete { .. } => {
                assembled.complete = true;
                break;
            }
            GenerationEvent::Error { message, .. } => {
                assembled.error = Some(message);
                break;
            }
        }
    }
    assembled
}

/// Run a streaming generation and assemble its output.
///
/// Returns `Err` only when the collaborator failed without producing any text.
pub async fn collect_stream(
    collaborator: &dyn GenerativeCollaborator,
    prompt: &str,
    history: &[Message],
    options: &GenerateOptions,
) -> LlmResult<AssembledText> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let (result, assembled) = tokio::join!(
        collaborator.generate_stream(prompt, history, options, tx),
        assemble(rx)
    );

    match result {
        Ok(()) => {
            if assembled.is_partial() {
                warn!(
                    collaborator = collaborator.name(),
                    chars = assembled.text.len(),
                    "Stream ended without a terminal event, using partial buffer"
                );
            } else {
                debug!(collaborator = collaborator.name(), chars = assembled.text.len(), "Stream assembled");
            }
            Ok(assembled)
        }
        Err(e) if assembled.text.is_empty() => Err(e),
        Err(e) => {
            warn!(
                collaborator = collaborator.name(),
                error = %e,
                chars = assembled.text.len(),
                "Stream failed midway, using partial buffer"
            );
            Ok(AssembledText {
                error: Some(e.to_string()),
                ..assembled
            })
        }
    }
}
