//! Chat channel implementations for Plugboard.
//!
//! A channel relays messages between a chat surface and the orchestrator.
//! [`inbound`] turns a raw [`ChannelMessage`](plugboard_core::ChannelMessage)
//! into what the orchestrator needs: a conversation id, a user turn and the
//! per-message context block.
//!
//! Available channels:
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod inbound;

pub use cli::CliChannel;
pub use inbound::{InboundMessage, InboundPolicy};
