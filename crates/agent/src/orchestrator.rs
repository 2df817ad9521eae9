//! The orchestration loop.
//!
//! One call to [`Orchestrator::respond`] takes a pending turn through to a
//! terminal state:
//!
//! ```text
//! append pending turn ──► request ──► reply ──► store, prune, deliver
//!        ▲                   │
//!        │                   ├──► tool call ──► invoke ──► tool turn ─┐
//!        └───────────────────┼────────────────────────────────────────┘
//!                            └──► error / unexpected ──► notice or nothing
//! ```
//!
//! The loop is bounded by `max_tool_depth`. Nothing escapes `respond`:
//! every failure ends up as an [`Outcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use plugboard_config::AppConfig;
use plugboard_core::channel::DeliveryTarget;
use plugboard_core::event::{DomainEvent, EventBus};
use plugboard_core::message::{ConversationId, Turn};
use plugboard_core::provider::{CompletionRequest, CompletionResponse, Provider};
use plugboard_core::tool::ToolArguments;
use plugboard_memory::ConversationStore;
use plugboard_tools::ToolInvoker;
use tracing::{debug, info, warn};

/// How a `respond` run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model replied and the reply was handed to the channel
    Replied { content: String },
    /// The request or its response was unusable; a failure notice was sent
    Failed { reason: String },
    /// Too many chained tool calls; the chain was abandoned
    DepthExceeded { depth: u32 },
    /// The model stopped for a reason with no transition; nothing was sent
    Unhandled { finish_reason: String },
}

/// Drives conversations between the model, the tools and the store.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    invoker: Arc<ToolInvoker>,
    store: Arc<ConversationStore>,
    event_bus: Arc<EventBus>,
    bot_name: String,
    keep_last_n: usize,
    max_tool_depth: u32,
    request_timeout: Duration,
    rescan_each_turn: bool,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        invoker: Arc<ToolInvoker>,
        store: Arc<ConversationStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            invoker,
            store,
            event_bus,
            bot_name: "Plugboard".into(),
            keep_last_n: 8,
            max_tool_depth: 10,
            request_timeout: Duration::from_secs(120),
            rescan_each_turn: true,
        }
    }

    /// Take bot name, limits and timeouts from configuration.
    pub fn with_settings(self, config: &AppConfig) -> Self {
        self.with_bot_name(&config.bot_name)
            .with_keep_last_n(config.conversation.keep_last_n)
            .with_max_tool_depth(config.conversation.max_tool_depth)
            .with_request_timeout(Duration::from_secs(config.provider.request_timeout_secs))
            .with_rescan_each_turn(config.tools.rescan_each_turn)
    }

    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = name.into();
        self
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    pub fn with_max_tool_depth(mut self, depth: u32) -> Self {
        self.max_tool_depth = depth;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Rescan the tools directory before every request.
    pub fn with_rescan_each_turn(mut self, enabled: bool) -> Self {
        self.rescan_each_turn = enabled;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// The notice users see when a request fails.
    pub fn failure_notice(&self) -> String {
        format!(
            "It seems that {} has encountered an error! Check the output for details.",
            self.bot_name
        )
    }

    /// Run one inbound turn to completion.
    ///
    /// Holds the conversation's lock for the whole run, so concurrent
    /// messages to one conversation are answered one at a time.
    pub async fn respond(
        &self,
        turn: Turn,
        target: &DeliveryTarget,
        conversation_id: &ConversationId,
        context_info: &str,
    ) -> Outcome {
        let _run = self.store.conversation_lock(conversation_id).await;

        if let Err(e) = target.channel.send_typing(&target.chat_id).await {
            debug!(error = %e, "Typing indicator failed");
        }

        let mut pending = turn;
        let mut depth: u32 = 0;

        loop {
            self.event_bus.publish(DomainEvent::TurnReceived {
                conversation_id: conversation_id.to_string(),
                role: pending.role.to_string(),
                timestamp: Utc::now(),
            });
            self.store.append(conversation_id, pending).await;

            let response = match self.request(conversation_id, context_info).await {
                Ok(response) => response,
                Err(reason) => return self.fail(target, conversation_id, reason).await,
            };

            match response {
                CompletionResponse::Reply { content, usage } => {
                    let (prompt_tokens, completion_tokens) = usage
                        .map(|u| (u.prompt_tokens, u.completion_tokens))
                        .unwrap_or_default();
                    info!(
                        conversation_id = %conversation_id,
                        prompt_tokens,
                        completion_tokens,
                        tool_calls = depth,
                        "Reply generated"
                    );
                    self.event_bus.publish(DomainEvent::ReplyGenerated {
                        conversation_id: conversation_id.to_string(),
                        model: self.model.clone(),
                        prompt_tokens,
                        completion_tokens,
                        timestamp: Utc::now(),
                    });

                    self.store
                        .append(conversation_id, Turn::assistant(content.clone()))
                        .await;
                    self.store.prune(conversation_id, self.keep_last_n).await;
                    self.deliver(target, &content).await;
                    return Outcome::Replied { content };
                }

                CompletionResponse::ToolCall { name, arguments } => {
                    if depth >= self.max_tool_depth {
                        warn!(
                            conversation_id = %conversation_id,
                            tool = %name,
                            depth,
                            "Tool-call chain exceeded maximum depth"
                        );
                        let notice = format!(
                            "{} stopped: tool-call chain exceeded maximum depth",
                            self.bot_name
                        );
                        self.deliver(target, &notice).await;
                        return Outcome::DepthExceeded { depth };
                    }

                    let parsed = match parse_arguments(&arguments) {
                        Ok(parsed) => parsed,
                        Err(reason) => {
                            let reason = format!("invalid arguments for {name}: {reason}");
                            return self.fail(target, conversation_id, reason).await;
                        }
                    };

                    debug!(conversation_id = %conversation_id, tool = %name, %arguments, "Model requested tool");
                    self.store
                        .append(conversation_id, Turn::tool_call(&name, arguments))
                        .await;
                    depth += 1;

                    let started = Instant::now();
                    let result = self.invoker.run(&name, parsed).await;
                    self.event_bus.publish(DomainEvent::ToolInvoked {
                        conversation_id: conversation_id.to_string(),
                        tool_name: name.clone(),
                        success: result.is_success(),
                        duration_ms: started.elapsed().as_millis() as u64,
                        timestamp: Utc::now(),
                    });

                    pending = Turn::tool_result(name, result.into_content());
                }

                CompletionResponse::ApiError { message, diagnostic } => {
                    warn!(conversation_id = %conversation_id, %diagnostic, "Model API returned an error");
                    return self.fail(target, conversation_id, message).await;
                }

                CompletionResponse::Unexpected {
                    finish_reason,
                    diagnostic,
                } => {
                    warn!(
                        conversation_id = %conversation_id,
                        %finish_reason,
                        %diagnostic,
                        "Unhandled finish reason, nothing sent"
                    );
                    return Outcome::Unhandled { finish_reason };
                }
            }
        }
    }

    /// Build and send one completion request.
    async fn request(
        &self,
        conversation_id: &ConversationId,
        context_info: &str,
    ) -> Result<CompletionResponse, String> {
        let catalog = self.invoker.catalog();
        if self.rescan_each_turn {
            if let Err(e) = catalog.reload().await {
                debug!(error = %e, "Continuing with previous tool set");
            }
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            tools: catalog.list_tools().await,
            turns: self.store.read(conversation_id, context_info).await,
        };

        debug!(
            conversation_id = %conversation_id,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        match tokio::time::timeout(self.request_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => {
                debug!(conversation_id = %conversation_id, finish = response.kind(), "Completion received");
                Ok(response)
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "model request timed out after {}s",
                self.request_timeout.as_secs()
            )),
        }
    }

    async fn fail(
        &self,
        target: &DeliveryTarget,
        conversation_id: &ConversationId,
        reason: String,
    ) -> Outcome {
        warn!(conversation_id = %conversation_id, %reason, "Completion failed");
        self.event_bus.publish(DomainEvent::CompletionFailed {
            conversation_id: conversation_id.to_string(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        self.deliver(target, &self.failure_notice()).await;
        Outcome::Failed { reason }
    }

    async fn deliver(&self, target: &DeliveryTarget, content: &str) {
        if let Err(e) = target.deliver(content).await {
            warn!(channel = %target.channel.name(), chat_id = %target.chat_id, error = %e, "Delivery failed");
        }
    }
}

/// Parse the model's raw argument string into a keyword mapping.
///
/// A blank string means no arguments.
fn parse_arguments(raw: &str) -> Result<ToolArguments, String> {
    if raw.trim().is_empty() {
        return Ok(ToolArguments::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}
