//! `plugboard chat` — Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use plugboard_agent::{Orchestrator, Outcome};
use plugboard_channels::{CliChannel, InboundPolicy};
use plugboard_config::AppConfig;
use plugboard_core::channel::{Channel, ChannelMessage, DeliveryTarget};
use plugboard_core::event::{DomainEvent, EventBus};
use plugboard_core::provider::Provider;
use plugboard_memory::ConversationStore;
use plugboard_providers::OpenAiCompatProvider;
use plugboard_tools::{ToolCatalog, ToolInvoker};
use tracing::warn;

/// Sender id the CLI policy treats as the bot itself.
const BOT_ID: &str = "plugboard";

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PLUGBOARD_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config)?);

    // Discovery problems are fatal at startup
    let catalog = Arc::new(ToolCatalog::from_settings(&config.tools));
    let tool_count = catalog.reload().await?;

    let invoker = Arc::new(ToolInvoker::new(
        catalog.clone(),
        Duration::from_secs(config.tools.invoke_timeout_secs),
    ));
    let mut store = ConversationStore::new(config.load_initial_prompt()?);
    if let Some(path) = config.prompt_file() {
        store = store.with_prompt_file(path);
    }
    let store = Arc::new(store);
    let event_bus = Arc::new(EventBus::default());
    spawn_event_printer(&event_bus);

    let orchestrator = Orchestrator::new(
        provider,
        &config.provider.model,
        invoker,
        store,
        event_bus,
    )
    .with_settings(&config);

    let channel = Arc::new(CliChannel::new(&config.bot_name));
    let policy = InboundPolicy::always(BOT_ID);

    if let Some(msg) = message {
        // Single message mode
        let outcome = handle(&orchestrator, &channel, &policy, channel.message(msg)).await;
        return match outcome {
            Some(Outcome::Replied { .. }) | None => Ok(()),
            Some(Outcome::Failed { reason }) => Err(reason.into()),
            Some(Outcome::DepthExceeded { depth }) => {
                Err(format!("stopped after {depth} chained tool calls").into())
            }
            Some(Outcome::Unhandled { finish_reason }) => {
                Err(format!("model stopped with finish reason '{finish_reason}'").into())
            }
        };
    }

    // Interactive mode
    println!();
    println!("  Plugboard — Interactive Mode");
    println!();
    println!("  Endpoint:  {}", config.provider.api_url);
    println!("  Model:     {}", config.provider.model);
    println!("  Tools:     {tool_count} from {}", config.tools.directory.display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut rx = channel
        .start()
        .await
        .map_err(|e| format!("Channel error: {e}"))?;

    prompt()?;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(msg) => {
                handle(&orchestrator, &channel, &policy, msg).await;
            }
            Err(e) => {
                warn!(error = %e, "CLI input failed");
                break;
            }
        }
        prompt()?;
    }

    println!();
    Ok(())
}

/// Adapt one message and run it through the orchestrator.
async fn handle(
    orchestrator: &Orchestrator,
    channel: &Arc<CliChannel>,
    policy: &InboundPolicy,
    message: ChannelMessage,
) -> Option<Outcome> {
    let inbound = policy.adapt(&message)?;

    let mut target = DeliveryTarget::new(channel.clone(), message.chat_id.clone());
    if let Some(reply_to) = inbound.reply_to {
        target = target.replying_to(reply_to);
    }

    Some(
        orchestrator
            .respond(
                inbound.turn,
                &target,
                &inbound.conversation_id,
                &inbound.context_info,
            )
            .await,
    )
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Show tool activity on stderr while the model works.
fn spawn_event_printer(event_bus: &EventBus) {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DomainEvent::ToolInvoked {
                tool_name,
                success,
                duration_ms,
                ..
            } = event.as_ref()
            {
                let mark = if *success { "ok" } else { "failed" };
                eprintln!("  [tool] {tool_name} {mark} ({duration_ms} ms)");
            }
        }
    });
}
