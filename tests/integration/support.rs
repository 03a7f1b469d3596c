//! Scripted collaborators shared by the integration tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use plan_pilot::models::settings::PilotConfig;
use plan_pilot::services::inference::HeuristicInference;
use plan_pilot::services::workflow::{LocalFileCollaborator, TaskExecutor, WorkflowCompiler};
use plan_pilot::services::Pipeline;
use plan_pilot::storage::Database;
use plan_pilot_core::{CommandCollaborator, CommandOutput, CoreResult, FileCollaborator, WriteFailure};
use plan_pilot_llm::ReplayCollaborator;

/// Delegates to the real file collaborator and counts writes
#[derive(Default)]
pub struct CountingFiles {
    inner: LocalFileCollaborator,
    writes: AtomicUsize,
}

impl CountingFiles {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileCollaborator for CountingFiles {
    async fn read_file(&self, path: &str, root: &Path) -> CoreResult<String> {
        self.inner.read_file(path, root).await
    }

    async fn write_file(&self, path: &str, root: &Path, content: &str) -> Result<(), WriteFailure> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_file(path, root, content).await
    }

    async fn exists(&self, path: &str, root: &Path) -> bool {
        self.inner.exists(path, root).await
    }
}

/// Answers commands from a script; unknown commands succeed
#[derive(Default)]
pub struct ScriptedCommands {
    exit_codes: HashMap<String, i32>,
    ran: Mutex<Vec<String>>,
}

impl ScriptedCommands {
    pub fn with_exit(mut self, command: &str, exit_code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), exit_code);
        self
    }

    pub async fn ran(&self) -> Vec<String> {
        self.ran.lock().await.clone()
    }
}

#[async_trait]
impl CommandCollaborator for ScriptedCommands {
    async fn run(&self, command: &str, _cwd: &Path) -> CoreResult<CommandOutput> {
        self.ran.lock().await.push(command.to_string());
        let exit_code = self.exit_codes.get(command).copied().unwrap_or(0);
        Ok(CommandOutput {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 { String::new() } else { "failed".to_string() },
        })
    }
}

pub fn test_config() -> PilotConfig {
    PilotConfig {
        task_delay_ms: 0,
        ..Default::default()
    }
}

pub fn compiler() -> WorkflowCompiler {
    WorkflowCompiler::new(Arc::new(HeuristicInference))
}

pub fn executor(
    files: Arc<dyn FileCollaborator>,
    commands: Arc<dyn CommandCollaborator>,
    root: &Path,
) -> TaskExecutor {
    TaskExecutor::new(files, commands, Arc::new(HeuristicInference), root, test_config())
}

/// A pipeline over an in-memory record store, returned alongside it
pub fn pipeline(
    replay: Arc<ReplayCollaborator>,
    files: Arc<dyn FileCollaborator>,
    commands: Arc<dyn CommandCollaborator>,
) -> (Pipeline, Arc<Database>) {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let pipeline = Pipeline::new(test_config(), replay, files, commands, db.clone());
    (pipeline, db)
}
