//! The orchestration loop — the heart of Plugboard.
//!
//! For every inbound turn the orchestrator:
//!
//! 1. **Appends** the turn to the conversation
//! 2. **Builds** a request: fresh system turn + history + tool descriptors
//! 3. **Sends** it to the model
//! 4. **If a tool call**: runs the tool, feeds the result back, goes to 1
//! 5. **If a reply**: stores it, prunes history, delivers it
//!
//! Tool chains are bounded by `conversation.max_tool_depth`.

pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{Orchestrator, Outcome};
