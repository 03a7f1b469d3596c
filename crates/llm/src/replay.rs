//! Replay Collaborator
//!
//! Plays back recorded model responses in order and remembers every prompt it
//! was asked. Used by the CLI to run the pipeline offline against captured
//! output, and by tests as a scripted model.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::provider::GenerativeCollaborator;
use crate::types::{GenerateOptions, LlmError, LlmResult, Message};
use plan_pilot_core::{CoreError, CoreResult};

/// A prompt as the replay collaborator received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub history_len: usize,
}

pub struct ReplayCollaborator {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    repeat_last: bool,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ReplayCollaborator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
            repeat_last: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Load every regular file in `dir`, ordered by file name.
    pub async fn from_dir(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(CoreError::not_found(format!(
                "No recorded responses in {}",
                dir.display()
            )));
        }

        let mut responses = Vec::with_capacity(files.len());
        for file in &files {
            responses.push(tokio::fs::read_to_string(file).await?);
        }
        debug!(dir = %dir.display(), count = responses.len(), "Loaded recorded responses");
        Ok(Self::new(responses))
    }

    /// Keep answering with the final response once the queue runs dry.
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Prompts received so far, in call order
    pub async fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl GenerativeCollaborator for ReplayCollaborator {
    fn name(&self) -> &str {
        "replay"
    }

    async fn generate(
        &self,
        prompt: &str,
        history: &[Message],
        _options: &GenerateOptions,
    ) -> LlmResult<String> {
        self.prompts.lock().await.push(RecordedPrompt {
            prompt: prompt.to_string(),
            history_len: history.len(),
        });

        let next = self.responses.lock().await.pop_front();
        let mut last = self.last.lock().await;
        match next {
            Some(response) => {
                *last = Some(response.clone());
                Ok(response)
            }
            None if self.repeat_last => last
                .clone()
                .ok_or_else(|| LlmError::exhausted("no recorded responses")),
            None => Err(LlmError::exhausted("recorded responses used up")),
        }
    }
}
