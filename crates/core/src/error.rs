//! Error types for the Plugboard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid tool descriptor at {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("Duplicate tool name '{name}' (second definition at {path})")]
    DuplicateName { name: String, path: PathBuf },

    #[error("Tool discovery failed: {0}")]
    Discovery(String),
}

impl ToolError {
    /// The bare failure message, without the variant prefix.
    ///
    /// This is what ends up after `"<name> returned an error: "` when a
    /// failure is re-injected into the conversation.
    pub fn reason(&self) -> String {
        match self {
            ToolError::ExecutionFailed { reason, .. } => reason.clone(),
            ToolError::InvalidArguments(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}
