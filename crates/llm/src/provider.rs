//! Generative Collaborator Trait
//!
//! Defines the interface the pipeline uses to ask a model for text.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{GenerateOptions, LlmResult, Message};
use plan_pilot_core::streaming::GenerationEvent;

/// Anything that turns a prompt plus history into text.
///
/// Provides:
/// - Single-shot completions (generate)
/// - Streaming completions (generate_stream)
///
/// Errors are reserved for the collaborator failing as a whole; an unhelpful
/// answer is still `Ok`.
#[async_trait]
pub trait GenerativeCollaborator: Send + Sync {
    /// Returns the collaborator name for identification.
    fn name(&self) -> &str;

    /// Generate a complete response.
    async fn generate(
        &self,
        prompt: &str,
        history: &[Message],
        options: &GenerateOptions,
    ) -> LlmResult<String>;

    /// Stream a response via a channel, ending with a terminal event.
    ///
    /// The default implementation generates the whole response and sends it as
    /// a single delta.
    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[Message],
        options: &GenerateOptions,
        tx: mpsc::Sender<GenerationEvent>,
    ) -> LlmResult<()> {
        match self.generate(prompt, history, options).await {
            Ok(text) => {
                let _ = tx.send(GenerationEvent::text(text)).await;
                let _ = tx.send(GenerationEvent::complete()).await;
                Ok(())
            }
            Err(e) => {
                let _ = tx.send(GenerationEvent::error(e.to_string())).await;
                Err(e)
            }
        }
    }
}
