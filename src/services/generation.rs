//! Generation Requests
//!
//! One model call, streamed or not. Streams are assembled in full before the
//! text is returned; an abnormally ended stream yields its partial buffer.

use plan_pilot_llm::{collect_stream, GenerateOptions, GenerativeCollaborator, LlmResult, Message};
use tracing::{debug, warn};

/// Ask the collaborator for one response
pub async fn request_text(
    collaborator: &dyn GenerativeCollaborator,
    prompt: &str,
    history: &[Message],
    stream: bool,
) -> LlmResult<String> {
    if !stream {
        let text = collaborator
            .generate(prompt, history, &GenerateOptions::default())
            .await?;
        debug!(collaborator = collaborator.name(), chars = text.len(), "Received response");
        return Ok(text);
    }

    let assembled = collect_stream(collaborator, prompt, history, &GenerateOptions::streaming()).await?;
    if let Some(error) = &assembled.error {
        warn!(
            collaborator = collaborator.name(),
            error = %error,
            chars = assembled.text.len(),
            "Stream ended with an error, continuing with partial text"
        );
    }
    Ok(assembled.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_pilot_llm::ReplayCollaborator;

    #[tokio::test]
    async fn test_streamed_and_plain_requests_agree() {
        let replay = ReplayCollaborator::new(["first", "second"]);
        assert_eq!(request_text(&replay, "p", &[], false).await.unwrap(), "first");
        assert_eq!(request_text(&replay, "p", &[], true).await.unwrap(), "second");
        assert!(request_text(&replay, "p", &[], true).await.is_err());
    }
}
