//! # Plugboard Core
//!
//! Domain types, traits, and error definitions for the Plugboard chat
//! orchestrator. This crate has **no I/O of its own** — it defines the model
//! that the provider, channel, tool, store, and agent crates implement against.
//!
//! ## Layout
//!
//! - [`message`] — turns, roles, and conversation ids
//! - [`provider`] — the model API abstraction and its request/response shapes
//! - [`tool`] — the tool trait and the name → callable registry
//! - [`channel`] — chat platforms and delivery targets
//! - [`event`] — in-process domain events

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod tool;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, ProviderError, ToolError};
pub use message::{ConversationId, Role, ToolCallDirective, Turn};
pub use provider::{CompletionRequest, CompletionResponse, Provider, ToolDescriptor, Usage};
pub use channel::{Channel, ChannelId, ChannelMessage, DeliveryTarget};
pub use tool::{Tool, ToolArguments, ToolRegistry};
pub use event::{DomainEvent, EventBus};
