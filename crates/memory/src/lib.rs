//! Conversation history for Plugboard.
//!
//! History lives in process memory only and is lost on restart.

pub mod conversation_store;

pub use conversation_store::{CLEARED_TOOL_RESPONSE, ConversationStore};
