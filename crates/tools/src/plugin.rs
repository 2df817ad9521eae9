//! Plugin tool — run a discovered executable as a tool.
//!
//! The arguments object is written to the child's stdin as JSON. Trimmed
//! stdout is the result. A non-zero exit is a failure whose message is the
//! trimmed stderr, or the exit status when stderr is empty.

use std::process::Stdio;

use async_trait::async_trait;
use plugboard_core::error::ToolError;
use plugboard_core::provider::ToolDescriptor;
use plugboard_core::tool::{Tool, ToolArguments};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::discovery::{DiscoveredTool, EntryPoint};

/// A tool backed by an executable in the plugins directory.
pub struct PluginTool {
    descriptor: ToolDescriptor,
    entry_point: Option<EntryPoint>,
}

impl PluginTool {
    pub fn new(descriptor: ToolDescriptor, entry_point: Option<EntryPoint>) -> Self {
        Self {
            descriptor,
            entry_point,
        }
    }

    fn command(&self, entry: &EntryPoint) -> Command {
        let mut command = match entry.interpreter {
            Some(interpreter) => {
                let mut c = Command::new(interpreter);
                c.arg(&entry.path);
                c
            }
            None => Command::new(&entry.path),
        };

        if let Some(dir) = entry.path.parent() {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.descriptor.name.clone(),
            reason: reason.into(),
        }
    }
}

impl From<DiscoveredTool> for PluginTool {
    fn from(discovered: DiscoveredTool) -> Self {
        Self::new(discovered.descriptor, discovered.entry_point)
    }
}

#[async_trait]
impl Tool for PluginTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let entry = self
            .entry_point
            .as_ref()
            .ok_or_else(|| self.failed("plugin has no run entry point"))?;

        let input = serde_json::to_vec(&arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        debug!(tool = %self.descriptor.name, entry = %entry.path.display(), "Starting plugin");

        let mut child = self
            .command(entry)
            .spawn()
            .map_err(|e| self.failed(format!("failed to start {}: {e}", entry.path.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A plugin that ignores its input may exit before reading it
            if let Err(e) = stdin.write_all(&input).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(self.failed(format!("failed to write arguments: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.failed(e.to_string()))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(tool = %self.descriptor.name, status = %output.status, "Plugin exited with failure");
        if stderr.is_empty() {
            Err(self.failed(output.status.to_string()))
        } else {
            Err(self.failed(stderr))
        }
    }
}
