//! Tool discovery and invocation for Plugboard.
//!
//! Tools come from two places: Rust types registered on the
//! [`ToolCatalog`] at startup, and plugins found in the tools directory
//! (a `<name>.json` schema plus a `run` executable beside it).
//!
//! The [`ToolInvoker`] is the only way the orchestrator runs a tool, and it
//! always returns text.

pub mod catalog;
pub mod discovery;
pub mod invoker;
pub mod plugin;

pub use catalog::ToolCatalog;
pub use discovery::{DiscoveredTool, EntryPoint, discover};
pub use invoker::{ToolInvocationResult, ToolInvoker};
pub use plugin::PluginTool;
