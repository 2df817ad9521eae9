//! Tool trait — the abstraction over callable side effects.
//!
//! A tool is anything the model can ask to have run: a plugin executable
//! discovered on disk, or a Rust type registered at startup. Every tool takes
//! a keyword mapping of arguments and produces text for the conversation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crate::error::ToolError;
use crate::provider::ToolDescriptor;

/// Keyword arguments passed to a tool.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "weather", "user_nickname").
    fn name(&self) -> &str;

    /// The descriptor advertised to the model.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with the given keyword arguments.
    async fn execute(&self, arguments: ToolArguments) -> std::result::Result<String, ToolError>;
}

/// A registry of available tools, keyed by name.
///
/// Registries are immutable snapshots once built; reloading produces a new
/// registry rather than mutating a shared one.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All descriptors, sorted by name so requests are deterministic.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
