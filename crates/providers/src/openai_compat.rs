//! OpenAI-compatible provider implementation.
//!
//! Speaks the function-calling dialect of `/chat/completions`: tools are
//! advertised under `functions`, a tool request comes back as
//! `message.function_call`, and tool results are sent as `function` turns.
//!
//! Works with OpenAI and any endpoint that still accepts this shape
//! (Ollama, vLLM, LocalAI, most proxies).

use std::time::Duration;

use async_trait::async_trait;
use plugboard_config::AppConfig;
use plugboard_core::error::ProviderError;
use plugboard_core::message::{Role, Turn};
use plugboard_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build the provider from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key (set api_key in config.toml or OPENAI_API_KEY)".into(),
            )
        })?;

        Self::new(
            "openai",
            &config.provider.api_url,
            api_key,
            Duration::from_secs(config.provider.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The URL completions are posted to.
    ///
    /// A base URL that already names the completions route is used as is.
    pub fn completions_url(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    /// Convert turns to the wire format.
    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|t| match t.role {
                Role::System => ApiMessage::plain("system", &t.content),
                Role::User => ApiMessage::plain("user", &t.content),
                Role::Assistant => ApiMessage {
                    role: "assistant".into(),
                    content: t.content.clone(),
                    name: None,
                    function_call: t.tool_call.as_ref().map(|call| ApiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    }),
                },
                Role::Tool => ApiMessage {
                    role: "function".into(),
                    content: t.content.clone(),
                    name: t.tool_name.clone(),
                    function_call: None,
                },
            })
            .collect()
    }

    /// Assemble the request body. `functions` is omitted when no tools are
    /// advertised, since some endpoints reject an empty list.
    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.turns),
        });

        if !request.tools.is_empty() {
            body["functions"] = serde_json::json!(request.tools);
        }

        body
    }
}

/// Interpret a response body.
///
/// The body is read the same way whatever the HTTP status was, so an
/// `error` payload on a 4xx/5xx still yields [`CompletionResponse::ApiError`].
pub fn parse_completion(body: &str) -> Result<CompletionResponse, ProviderError> {
    let parsed: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("{e}: {body}")))?;

    let Some(choice) = parsed.choices.into_iter().next() else {
        let message = parsed
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "No choices in response".into());
        return Ok(CompletionResponse::ApiError {
            message,
            diagnostic: body.to_string(),
        });
    };

    let Some(finish_reason) = choice.finish_reason else {
        return Ok(CompletionResponse::ApiError {
            message: "Response choice has no finish reason".into(),
            diagnostic: body.to_string(),
        });
    };

    match finish_reason.as_str() {
        "stop" => Ok(CompletionResponse::Reply {
            content: choice.message.content.unwrap_or_default(),
            usage: parsed.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        }),
        "function_call" => match choice.message.function_call {
            Some(call) => Ok(CompletionResponse::ToolCall {
                name: call.name,
                arguments: call.arguments,
            }),
            None => Ok(CompletionResponse::ApiError {
                message: "finish_reason is function_call but no function_call was sent".into(),
                diagnostic: body.to_string(),
            }),
        },
        _ => Ok(CompletionResponse::Unexpected {
            finish_reason,
            diagnostic: body.to_string(),
        }),
    }
}

#[async_trait]
impl plugboard_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let url = self.completions_url();
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.turns.len(),
            functions = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, provider = %self.name, "Provider returned non-success status");
        }

        parse_completion(&text)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
}

impl ApiMessage {
    fn plain(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
            function_call: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: ApiResponseMessage,
}

/// Response messages may carry `"content": null` on function calls.
#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<ApiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}
