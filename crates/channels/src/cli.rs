//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin, writes replies to stdout.
//! Used for `plugboard chat`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use plugboard_core::channel::{Channel, ChannelId, ChannelMessage};
use plugboard_core::error::ChannelError;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The chat id every CLI message belongs to.
pub const CLI_CHAT_ID: &str = "cli_session";

const LOCAL_USER_ID: &str = "local_user";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    bot_name: String,
    user_name: String,
    next_message_id: Arc<AtomicU64>,
}

impl CliChannel {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            id: ChannelId("cli".into()),
            bot_name: bot_name.into(),
            user_name: std::env::var("USER").unwrap_or_else(|_| "User".into()),
            next_message_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build the message for one line of user input.
    pub fn message(&self, content: impl Into<String>) -> ChannelMessage {
        build_message(
            &self.id,
            &self.user_name,
            self.next_message_id.fetch_add(1, Ordering::Relaxed),
            content.into(),
        )
    }

    /// Feed lines from any reader into the returned receiver.
    ///
    /// Blank lines are skipped; `exit`, `quit`, `/exit`, `/quit` and `:q`
    /// end the session, as does end of input.
    pub fn spawn_reader<R>(&self, reader: R) -> mpsc::Receiver<Result<ChannelMessage, ChannelError>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let user_name = self.user_name.clone();
        let counter = self.next_message_id.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let id = counter.fetch_add(1, Ordering::Relaxed);
                        let msg = build_message(&channel_id, &user_name, id, line);
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        warn!(error = %e, "Failed to read terminal input");
                        if tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await.is_err() {
                            debug!("Input receiver closed before the read error was reported");
                        }
                        break;
                    }
                }
            }
        });

        rx
    }
}

fn build_message(channel_id: &ChannelId, user_name: &str, id: u64, content: String) -> ChannelMessage {
    ChannelMessage {
        channel_id: channel_id.clone(),
        message_id: Some(id.to_string()),
        sender_id: LOCAL_USER_ID.into(),
        sender_name: Some(user_name.to_string()),
        content,
        chat_id: CLI_CHAT_ID.into(),
        chat_name: Some("terminal".into()),
        metadata: serde_json::Map::new(),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        Ok(self.spawn_reader(io::stdin()))
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        println!("{}: {content}", self.bot_name);
        Ok(())
    }
}
