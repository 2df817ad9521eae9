//! Inbound adaptation — from a platform message to orchestrator inputs.
//!
//! The conversation is the chat the message arrived in, so everyone in a
//! channel shares one history. Each user turn is tagged with the sender so
//! the model can tell speakers apart.

use plugboard_core::channel::ChannelMessage;
use plugboard_core::message::{ConversationId, Turn};

/// What the orchestrator needs to answer one message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    pub turn: Turn,
    pub context_info: String,
    /// Platform message to reply to, when there is one
    pub reply_to: Option<String>,
}

/// Which messages the bot answers.
#[derive(Debug, Clone)]
pub struct InboundPolicy {
    bot_id: String,
    require_mention: bool,
}

impl InboundPolicy {
    /// Only answer messages that mention `bot_id`.
    pub fn mention_required(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            require_mention: true,
        }
    }

    /// Answer everything not sent by the bot itself (direct chats, CLI).
    pub fn always(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            require_mention: false,
        }
    }

    /// The mention token as it appears in message text.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.bot_id)
    }

    /// Adapt a message, or `None` when the bot should stay quiet.
    pub fn adapt(&self, message: &ChannelMessage) -> Option<InboundMessage> {
        if message.sender_id == self.bot_id {
            return None;
        }

        let mention = self.mention();
        if self.require_mention && !message.content.contains(&mention) {
            return None;
        }

        let content = message.content.replace(&mention, "");
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let sender_name = message.sender_name.as_deref().unwrap_or("unknown");
        let text = format!("[ID: {}, Name: {}]: {}", message.sender_id, sender_name, content);

        Some(InboundMessage {
            conversation_id: ConversationId::new(&message.chat_id),
            turn: Turn::user(text),
            context_info: context_info(message),
            reply_to: message.message_id.clone(),
        })
    }
}

/// The per-message block appended to the base instructions.
pub fn context_info(message: &ChannelMessage) -> String {
    let origin = message.chat_name.as_deref().unwrap_or(&message.chat_id);
    format!(
        "\n\nCurrent message context:\n\
         Message ID: \"{}\"\n\
         Message Author: \"{}\"\n\
         Message Author User ID: \"{}\"\n\
         Message origins: From channel \"{}\" on {}\n\
         Channel ID: \"{}\"\n",
        message.message_id.as_deref().unwrap_or("unknown"),
        message.sender_name.as_deref().unwrap_or("unknown"),
        message.sender_id,
        origin,
        message.channel_id,
        message.chat_id,
    )
}
