//! Provider trait — the abstraction over the chat-completion API.
//!
//! A Provider takes the turn history plus the advertised tools and returns
//! one [`CompletionResponse`]: a reply, a tool call, or a failure.
//! Transport and authentication are the implementation's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Turn;

/// Everything the model needs for one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,

    /// Ordered history, system turn first
    pub turns: Vec<Turn>,
}

/// A tool advertised to the model.
///
/// Descriptor files hold the schema; the name always comes from the file
/// stem. Unknown top-level keys are kept and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name
    #[serde(default)]
    pub name: String,

    /// Description of what the tool does
    #[serde(default)]
    pub description: String,

    /// JSON Schema describing the tool's parameters
    #[serde(default = "empty_object_schema")]
    pub parameters: serde_json::Value,

    /// Any other keys present in the descriptor file
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            extra: serde_json::Map::new(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// How the model finished, as a closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionResponse {
    /// `finish_reason == "stop"`: a user-facing reply
    Reply {
        content: String,
        usage: Option<Usage>,
    },

    /// `finish_reason == "function_call"`: the model wants a tool run
    ToolCall {
        name: String,
        /// Raw argument string, not yet parsed
        arguments: String,
    },

    /// The API answered with an error payload or no usable choice
    ApiError {
        message: String,
        /// Raw response body for the logs
        diagnostic: String,
    },

    /// A finish reason the loop has no transition for (e.g. "length")
    Unexpected {
        finish_reason: String,
        diagnostic: String,
    },
}

impl CompletionResponse {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionResponse::Reply { .. } => "reply",
            CompletionResponse::ToolCall { .. } => "tool_call",
            CompletionResponse::ApiError { .. } => "api_error",
            CompletionResponse::Unexpected { .. } => "unexpected",
        }
    }
}

/// The core Provider trait.
///
/// The orchestration loop calls `complete()` without knowing which
/// endpoint sits behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and interpret the response.
    ///
    /// Error payloads returned by the API come back as
    /// [`CompletionResponse::ApiError`]; `Err` is reserved for failures
    /// where no response could be read at all.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;
}
