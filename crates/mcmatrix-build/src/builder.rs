//! The external builder seam.
//!
//! The planner only needs invoke-and-get-result: the builder runs inside a
//! module directory and either succeeds or fails. [`CommandBuilder`] is
//! the production implementation, spawning the configured command;
//! [`crate::fakes::ScriptedBuilder`] stands in for it in tests.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use mcmatrix_core::manifest::BuilderConfig;
use mcmatrix_core::{McMatrixError, Result};

/// Result of one builder invocation.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Exit code (`-1` when the process was killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl BuildOutput {
    /// A short human-readable failure description: exit code plus the
    /// last few lines of stderr.
    pub fn failure_detail(&self) -> String {
        let tail: Vec<&str> = self.stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        if tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {}", self.exit_code, tail.join(" | "))
        }
    }
}

/// Invoke an external build on a module directory.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Run the build. `Err` means the build could not be executed at all
    /// (spawn failure, timeout); an unsuccessful [`BuildOutput`] means it
    /// ran and failed. The planner treats both as recoverable.
    async fn build(&self, module_dir: &Path) -> Result<BuildOutput>;
}

/// Production [`Builder`]: spawns the configured command inside the
/// module directory with piped output.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: Vec<String>,
    timeout_secs: u64,
}

impl CommandBuilder {
    pub fn new(command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command,
            timeout_secs,
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self::new(config.command.clone(), config.timeout_secs)
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, module_dir: &Path) -> Result<BuildOutput> {
        let start = Instant::now();

        let exe = self.command.first().ok_or_else(|| {
            McMatrixError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "builder command is empty",
            ))
        })?;
        let args = &self.command[1..];

        let child = Command::new(exe)
            .args(args)
            .current_dir(module_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                McMatrixError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("build timed out after {} seconds", self.timeout_secs),
                ))
            })??
        } else {
            child.wait_with_output().await?
        };

        Ok(BuildOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}
