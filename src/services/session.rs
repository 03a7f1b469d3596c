//! Session Registry
//!
//! Sessions carry the conversation history, the source files read so far, and
//! the workflow currently in flight. They live in an explicitly owned registry
//! keyed by session id; nothing is global.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use plan_pilot_llm::Message;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::models::workflow::{SourceFile, WorkflowContext};

/// One planning conversation against one project
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub project_path: PathBuf,
    pub history: Vec<Message>,
    /// Source files read during this session, by normalized path
    pub source_cache: HashMap<String, String>,
    /// The workflow in flight, if any. Replacing it discards the old one.
    pub workflow: Option<WorkflowContext>,
    pub created_at: String,
}

impl Session {
    fn new(project_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_path,
            history: Vec::new(),
            source_cache: HashMap::new(),
            workflow: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn cache_source(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.source_cache.insert(path.into(), content.into());
    }

    pub fn cached_source(&self, path: &str) -> Option<&str> {
        self.source_cache.get(path).map(String::as_str)
    }

    /// Install a new workflow, superseding any previous one
    pub fn begin_workflow(&mut self, mut workflow: WorkflowContext) -> &mut WorkflowContext {
        let known: Vec<String> = self
            .source_cache
            .keys()
            .filter(|p| !workflow.context_files.contains(p))
            .cloned()
            .collect();
        workflow.context_files.extend(known);
        if let Some(previous) = self.workflow.take() {
            debug!(session_id = %self.id, workflow_id = %previous.id, "Superseded workflow");
        }
        self.workflow.insert(workflow)
    }

    /// Finish the current workflow, keeping what it read
    pub fn end_workflow(&mut self) -> Option<WorkflowContext> {
        let workflow = self.workflow.take()?;
        for SourceFile { path, content } in &workflow.sources {
            self.source_cache.insert(path.clone(), content.clone());
        }
        Some(workflow)
    }
}

/// Owner of all live sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a project and return its id
    pub async fn create(&self, project_path: impl Into<PathBuf>) -> String {
        let session = Session::new(project_path.into());
        let id = session.id.clone();
        debug!(session_id = %id, project = %session.project_path.display(), "Created session");
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        id
    }

    pub async fn lookup(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub async fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Destroyed session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
