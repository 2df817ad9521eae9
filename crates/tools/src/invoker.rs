//! Tool invoker — run a tool by name and always come back with text.
//!
//! The tool runs on its own task under a timeout, so a panic or a hang is
//! reported like any other failure. Nothing escapes to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use plugboard_core::error::ToolError;
use plugboard_core::tool::ToolArguments;
use tracing::{debug, warn};

use crate::catalog::ToolCatalog;

/// What came back from one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocationResult {
    Success(String),
    Failure { tool_name: String, message: String },
}

impl ToolInvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolInvocationResult::Success(_))
    }

    /// The text that goes into the conversation as the tool turn.
    pub fn into_content(self) -> String {
        match self {
            ToolInvocationResult::Success(output) => output,
            ToolInvocationResult::Failure { tool_name, message } => {
                format!("{tool_name} returned an error: {message}")
            }
        }
    }
}

pub struct ToolInvoker {
    catalog: Arc<ToolCatalog>,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(catalog: Arc<ToolCatalog>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Invoke `name` and return the tool turn's content.
    pub async fn invoke(&self, name: &str, arguments: ToolArguments) -> String {
        self.run(name, arguments).await.into_content()
    }

    /// Invoke `name`, keeping success and failure apart.
    pub async fn run(&self, name: &str, arguments: ToolArguments) -> ToolInvocationResult {
        let started = Instant::now();
        let result = self.execute(name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                debug!(tool = %name, elapsed_ms, "Tool succeeded");
                ToolInvocationResult::Success(output)
            }
            Err(e) => {
                let message = e.reason();
                warn!(tool = %name, elapsed_ms, error = %message, "Tool failed");
                ToolInvocationResult::Failure {
                    tool_name: name.to_string(),
                    message,
                }
            }
        }
    }

    async fn execute(&self, name: &str, arguments: ToolArguments) -> Result<String, ToolError> {
        let tool = self
            .catalog
            .snapshot()
            .await
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let timeout = self.timeout;
        let handle = tokio::spawn(async move {
            tokio::time::timeout(timeout, tool.execute(arguments)).await
        });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
            Err(join_error) if join_error.is_panic() => Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: panic_message(join_error.into_panic()),
            }),
            Err(join_error) => Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: join_error.to_string(),
            }),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
