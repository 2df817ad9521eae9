//! Shared test fixtures for the orchestrator tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plugboard_core::channel::{Channel, ChannelId, ChannelMessage, DeliveryTarget};
use plugboard_core::error::{ChannelError, ProviderError, ToolError};
use plugboard_core::event::EventBus;
use plugboard_core::message::{ConversationId, Turn};
use plugboard_core::provider::{
    CompletionRequest, CompletionResponse, Provider, ToolDescriptor, Usage,
};
use plugboard_core::tool::{Tool, ToolArguments};
use plugboard_memory::ConversationStore;
use plugboard_tools::{ToolCatalog, ToolInvoker};
use tokio::sync::mpsc;

use crate::orchestrator::{Orchestrator, Outcome};

pub const BASE_PROMPT: &str = "You are TestBot.";
pub const CONTEXT: &str = "\nMessage ID: \"1\"";

type Scripted = Result<CompletionResponse, ProviderError>;

/// A provider that replays a fixed script and records every request.
///
/// Panics if called more often than the script allows.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: script exhausted")
    }
}

pub fn reply(text: &str) -> CompletionResponse {
    CompletionResponse::Reply {
        content: text.into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        }),
    }
}

pub fn tool_call(name: &str, arguments: &str) -> CompletionResponse {
    CompletionResponse::ToolCall {
        name: name.into(),
        arguments: arguments.into(),
    }
}

/// A channel that records what it was asked to send.
pub struct RecordingChannel {
    id: ChannelId,
    sent: tokio::sync::Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("recording".into()),
            sent: tokio::sync::Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::DeliveryFailed {
                channel: "recording".into(),
                reason: "offline".into(),
            });
        }
        self.sent.lock().await.push(content.to_string());
        Ok(())
    }
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "echo",
            "Echo the text back",
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
        )
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        arguments
            .get("text")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".into()))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("fail", "Always fails", serde_json::json!({"type": "object"}))
    }

    async fn execute(&self, _arguments: ToolArguments) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "fail".into(),
            reason: "service unavailable".into(),
        })
    }
}

/// Everything a `respond` call needs, wired together.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub provider: Arc<ScriptedProvider>,
    pub channel: Arc<RecordingChannel>,
    pub store: Arc<ConversationStore>,
    pub event_bus: Arc<EventBus>,
}

impl Harness {
    pub async fn new(script: Vec<Scripted>) -> Self {
        Self::with(script, |o| o).await
    }

    pub async fn with(
        script: Vec<Scripted>,
        configure: impl FnOnce(Orchestrator) -> Orchestrator,
    ) -> Self {
        let provider = Arc::new(ScriptedProvider::new(script));
        let catalog = ToolCatalog::new("/nonexistent/plugins", true)
            .with_builtin(Arc::new(EchoTool))
            .with_builtin(Arc::new(FailingTool));
        catalog.reload().await.unwrap();
        let invoker = Arc::new(ToolInvoker::new(Arc::new(catalog), Duration::from_secs(5)));
        let store = Arc::new(ConversationStore::new(BASE_PROMPT));
        let event_bus = Arc::new(EventBus::default());

        let orchestrator = configure(
            Orchestrator::new(
                provider.clone(),
                "test-model",
                invoker,
                store.clone(),
                event_bus.clone(),
            )
            .with_bot_name("TestBot"),
        );

        Self {
            orchestrator,
            provider,
            channel: Arc::new(RecordingChannel::new()),
            store,
            event_bus,
        }
    }

    pub async fn respond(&self, text: &str) -> Outcome {
        self.respond_in("c1", text).await
    }

    pub async fn respond_in(&self, conversation: &str, text: &str) -> Outcome {
        let target = DeliveryTarget::new(self.channel.clone(), conversation);
        self.orchestrator
            .respond(
                Turn::user(text),
                &target,
                &ConversationId::from(conversation),
                CONTEXT,
            )
            .await
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.store.history(&ConversationId::from("c1")).await
    }
}
