//! Adapter child process
//!
//! Spawns the debug adapter with a caller-supplied argv vector, pipes its
//! stdio, and exposes `wait`/`kill`. The stdin/stdout pair is handed to the
//! connection, which owns it exclusively for the life of the session.

use crate::error::{Error, Result};
use std::process::Stdio;
use stepline_config::AdapterSpawnConfig;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

/// A running debug adapter.
pub struct AdapterProcess {
    child: Child,
    stderr: Option<ChildStderr>,
}

impl std::fmt::Debug for AdapterProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterProcess")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl AdapterProcess {
    /// Spawn the adapter and take its stdio pipes.
    pub fn spawn(config: &AdapterSpawnConfig) -> Result<(Self, ChildStdin, ChildStdout)> {
        info!(
            command = %config.command,
            args = ?config.args,
            "spawning debug adapter"
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::Communication(format!("failed to spawn {}: {e}", config.command))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Communication("failed to take adapter stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Communication("failed to take adapter stdout".to_string()))?;
        let stderr = child.stderr.take();

        debug!(pid = ?child.id(), "adapter spawned");
        Ok((Self { child, stderr }, stdin, stdout))
    }

    /// Take the adapter's stderr pipe, for the collaborator that wants to
    /// surface adapter diagnostics.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Whether the adapter is still running
    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// Wait for the adapter to exit and return its exit code.
    ///
    /// A termination without an exit code (killed by signal) is reported
    /// as -1.
    pub async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await?;
        let code = status.code().unwrap_or(-1);
        info!(code, "adapter exited");
        Ok(code)
    }

    /// Kill the adapter. Last resort when it stops answering.
    pub async fn kill(&mut self) -> Result<()> {
        warn!("killing adapter process");
        self.child.kill().await?;
        Ok(())
    }
}

impl Drop for AdapterProcess {
    fn drop(&mut self) {
        // Best effort: no await in Drop
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_missing_executable_fails() {
        let config = AdapterSpawnConfig::new("/nonexistent/debug-adapter");
        let result = AdapterProcess::spawn(&config);
        assert!(matches!(result, Err(Error::Communication(_))));
    }

    #[tokio::test]
    async fn wait_reports_exit_code() {
        let config = AdapterSpawnConfig::new("sh").arg("-c").arg("exit 7");
        let (mut process, _stdin, _stdout) = AdapterProcess::spawn(&config).unwrap();
        assert_eq!(process.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn kill_then_wait_completes() {
        let config = AdapterSpawnConfig::new("sh").arg("-c").arg("sleep 30");
        let (mut process, _stdin, _stdout) = AdapterProcess::spawn(&config).unwrap();
        assert!(process.is_running());

        process.kill().await.unwrap();
        let code = process.wait().await.unwrap();
        assert_eq!(code, -1);
        assert!(!process.is_running());
    }
}
