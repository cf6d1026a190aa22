//! Shell tool
//!
//! Executes shell commands in a subprocess with a configurable timeout.
//! Mutating and externally visible, so it is in the unsafe-concurrency
//! partition and belongs in the default dangerous set gated by human review.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{Result, WindlassError};

use super::{Tool, ToolContext, ToolOutput};

/// Default command timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Tool for executing shell commands.
///
/// Commands run via `sh -c` in the workspace directory. Stdout and stderr
/// are combined into the result; a non-zero exit status is reported in the
/// result text rather than as a tool failure, so the model can react to it.
///
/// # Parameters
/// - `command`: The shell command to execute (required)
/// - `timeout`: Timeout in seconds, defaults to 60 (optional)
pub struct ShellTool {
    timeout: Duration,
}

impl ShellTool {
    /// Create a shell tool with the default timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create a shell tool with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its combined stdout and stderr"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default 60)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WindlassError::Tool("Missing 'command' argument".into()))?;
        let timeout = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(self.timeout);

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(workspace) = &ctx.workspace {
            cmd.current_dir(workspace);
        }

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                WindlassError::Tool(format!(
                    "Command timed out after {} seconds",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| WindlassError::Tool(format!("Failed to spawn command: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = String::new();
        if !stdout.is_empty() {
            result.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&stderr);
        }
        if result.is_empty() {
            result = "(no output)".to_string();
        }
        if !output.status.success() {
            result.push_str(&format!(
                "\n[exit status: {}]",
                output.status.code().unwrap_or(-1)
            ));
        }

        Ok(ToolOutput::message(result))
    }
}
