//! Local Collaborators
//!
//! File and command collaborators backed by the local machine. The file
//! collaborator is confined to the project root; the command collaborator runs
//! `sh -c` with a timeout and refuses obviously destructive commands.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use plan_pilot_core::{
    CommandCollaborator, CommandOutput, CoreError, CoreResult, FileCollaborator, WriteFailure,
};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Blocked shell commands
const BLOCKED_COMMANDS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "rm -rf ~/",
    "> /dev/sda",
    "dd if=/dev/zero",
    "mkfs.",
    ":(){ :|:& };:",
    "chmod -R 777 /",
    "chown -R",
];

/// Captured output beyond this many bytes is truncated
const MAX_OUTPUT_BYTES: usize = 30_000;

// ============================================================================
// File Collaborator
// ============================================================================

/// File collaborator over the local file system
#[derive(Debug, Clone, Default)]
pub struct LocalFileCollaborator;

impl LocalFileCollaborator {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `path` under `root`, rejecting anything that could escape it
    fn resolve(path: &str, root: &Path) -> Result<PathBuf, WriteFailure> {
        if path.trim().is_empty() {
            return Err(WriteFailure::new("invalid_path", "Path is empty"));
        }
        if path.contains('\0') {
            return Err(WriteFailure::new("invalid_path", "Path contains a NUL byte"));
        }
        let relative = Path::new(path);
        if relative.is_absolute() || path.starts_with('/') || path.starts_with('\\') {
            return Err(WriteFailure::new(
                "invalid_path",
                format!("Absolute path {} is outside the project", path),
            )
            .with_suggestion("Use a path relative to the project root"));
        }
        if relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir | std::path::Component::Prefix(_)))
        {
            return Err(WriteFailure::new(
                "invalid_path",
                format!("Path {} climbs out of the project", path),
            )
            .with_suggestion("Remove `..` segments and write inside the project"));
        }
        Ok(root.join(relative))
    }
}

#[async_trait]
impl FileCollaborator for LocalFileCollaborator {
    async fn read_file(&self, path: &str, root: &Path) -> CoreResult<String> {
        let full = Self::resolve(path, root).map_err(|f| CoreError::invalid_path(f.message))?;
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::not_found(format!("File not found: {}", path)))
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    async fn write_file(&self, path: &str, root: &Path, content: &str) -> Result<(), WriteFailure> {
        let full = Self::resolve(path, root)?;

        if let Some(parent) = full.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Err(io_failure(path, &e)
                    .with_suggestion("Check that the parent directory is writable"));
            }
        }
        if full.is_dir() {
            return Err(WriteFailure::new(
                "is_directory",
                format!("{} is a directory", path),
            )
            .with_suggestion("Write to a file inside the directory instead"));
        }

        tokio::fs::write(&full, content)
            .await
            .map_err(|e| io_failure(path, &e))?;
        debug!(path = %path, bytes = content.len(), "Wrote file");
        Ok(())
    }

    async fn exists(&self, path: &str, root: &Path) -> bool {
        match Self::resolve(path, root) {
            Ok(full) => tokio::fs::metadata(&full).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn io_failure(path: &str, e: &std::io::Error) -> WriteFailure {
    let error_type = match e.kind() {
        std::io::ErrorKind::PermissionDenied => "permission_denied",
        std::io::ErrorKind::NotFound => "not_found",
        std::io::ErrorKind::AlreadyExists => "already_exists",
        _ => "io_error",
    };
    let failure = WriteFailure::new(error_type, format!("Failed to write {}: {}", path, e));
    if error_type == "permission_denied" {
        failure.with_suggestion("Choose a location inside the project that is writable")
    } else {
        failure
    }
}

// ============================================================================
// Command Collaborator
// ============================================================================

/// Runs commands through `sh -c` in the given directory
#[derive(Debug, Clone)]
pub struct ShellCommandCollaborator {
    timeout: Duration,
}

impl Default for ShellCommandCollaborator {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl ShellCommandCollaborator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn blocked(command: &str) -> Option<&'static str> {
        BLOCKED_COMMANDS.iter().copied().find(|b| command.contains(b))
    }
}

#[async_trait]
impl CommandCollaborator for ShellCommandCollaborator {
    async fn run(&self, command: &str, cwd: &Path) -> CoreResult<CommandOutput> {
        if let Some(pattern) = Self::blocked(command) {
            warn!(command = %command, pattern = %pattern, "Blocked command");
            return Err(CoreError::command(format!(
                "Command blocked for safety: contains '{}'",
                pattern
            )));
        }

        #[cfg(windows)]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_arg) = ("sh", "-c");

        let mut child = Command::new(shell)
            .arg(shell_arg)
            .arg(command)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::command(format!("Failed to spawn command: {}", e)))?;

        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();

        // Drain both pipes while waiting so a chatty command cannot block
        let read_out = async {
            let mut buf = Vec::new();
            if let Some(pipe) = child_stdout.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        };
        let read_err = async {
            let mut buf = Vec::new();
            if let Some(pipe) = child_stderr.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        };
        let drain = async { tokio::join!(read_out, read_err) };

        let waited = tokio::time::timeout(self.timeout, async {
            let (status, (out, err)) = tokio::join!(child.wait(), drain);
            (status, out, err)
        })
        .await;

        match waited {
            Ok((Ok(status), out, err)) => {
                let output = CommandOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: truncate_output(String::from_utf8_lossy(&out).into_owned()),
                    stderr: truncate_output(String::from_utf8_lossy(&err).into_owned()),
                };
                debug!(command = %command, exit_code = output.exit_code, "Command finished");
                Ok(output)
            }
            Ok((Err(e), _, _)) => Err(CoreError::command(format!("Failed to execute command: {}", e))),
            Err(_) => {
                let _ = child.kill().await;
                Err(CoreError::command(format!(
                    "Command timed out after {} s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n... (output truncated)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_exists() {
        let dir = TempDir::new().unwrap();
        let files = LocalFileCollaborator::new();

        assert!(!files.exists("app/hello/page.tsx", dir.path()).await);
        files
            .write_file("app/hello/page.tsx", dir.path(), "export default 1;\n")
            .await
            .unwrap();
        assert!(files.exists("app/hello/page.tsx", dir.path()).await);
        assert_eq!(
            files.read_file("app/hello/page.tsx", dir.path()).await.unwrap(),
            "export default 1;\n"
        );
    }

    #[tokio::test]
    async fn test_paths_confined_to_root() {
        let dir = TempDir::new().unwrap();
        let files = LocalFileCollaborator::new();

        let failure = files.write_file("../escape.txt", dir.path(), "x").await.unwrap_err();
        assert_eq!(failure.error_type, "invalid_path");
        assert!(!failure.suggestions.is_empty());

        let failure = files.write_file("/etc/passwd", dir.path(), "x").await.unwrap_err();
        assert_eq!(failure.error_type, "invalid_path");
        assert!(!files.exists("../escape.txt", dir.path()).await);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = LocalFileCollaborator::new()
            .read_file("nope.ts", dir.path())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_output_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let shell = ShellCommandCollaborator::default();

        let ok = shell.run("echo hello", dir.path()).await.unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout.trim(), "hello");

        let failed = shell.run("echo oops >&2; exit 3", dir.path()).await.unwrap();
        assert_eq!(failed.exit_code, 3);
        assert_eq!(failed.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_shell_command_blocked() {
        let dir = TempDir::new().unwrap();
        let err = ShellCommandCollaborator::default()
            .run("rm -rf / --no-preserve-root", dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_timeout() {
        let dir = TempDir::new().unwrap();
        let shell = ShellCommandCollaborator::new(Duration::from_millis(100));
        let err = shell.run("sleep 5", dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
