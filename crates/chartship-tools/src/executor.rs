use crate::command::{ToolCommand, ToolError};
use std::process::Stdio;

/// Abstraction over external tool execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ToolExecutor: Send + Sync {
    /// Run a command and capture stdout.
    async fn exec(&self, command: &ToolCommand) -> Result<String, ToolError>;

    /// Run a command, streaming its output to the terminal.
    async fn exec_streaming(&self, command: &ToolCommand) -> Result<(), ToolError>;
}

/// Runs tools as child processes found on `PATH`.
pub struct RealExecutor;

impl RealExecutor {
    fn command(command: &ToolCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl ToolExecutor for RealExecutor {
    async fn exec(&self, command: &ToolCommand) -> Result<String, ToolError> {
        tracing::debug!(%command, cwd = ?command.cwd, "exec");

        let output = Self::command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ToolError::NotFound {
                program: command.program.clone(),
                source: e,
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| ToolError::InvalidUtf8 {
                program: command.program.clone(),
                source: e,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ToolError::CommandFailed {
                command: command.to_string(),
                stderr,
            })
        }
    }

    async fn exec_streaming(&self, command: &ToolCommand) -> Result<(), ToolError> {
        tracing::debug!(%command, cwd = ?command.cwd, "exec (streaming)");

        let status = Self::command(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ToolError::NotFound {
                program: command.program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::CommandFailed {
                command: command.to_string(),
                stderr: format!("exit code: {status}"),
            })
        }
    }
}
