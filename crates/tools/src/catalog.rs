//! Tool catalog — the live set of tools the model may call.
//!
//! Holds an immutable [`ToolRegistry`] snapshot built from built-in tools
//! plus whatever the plugins directory holds. `reload()` swaps in a fresh
//! snapshot; a failed reload leaves the current one in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugboard_config::ToolSettings;
use plugboard_core::error::ToolError;
use plugboard_core::provider::ToolDescriptor;
use plugboard_core::tool::{Tool, ToolRegistry};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::discovery::{self, DiscoveredTool};
use crate::plugin::PluginTool;

pub struct ToolCatalog {
    enabled: bool,
    directory: PathBuf,
    builtins: Vec<Arc<dyn Tool>>,
    current: RwLock<Arc<ToolRegistry>>,
}

impl ToolCatalog {
    /// An empty catalog; call [`reload`](Self::reload) to populate it.
    pub fn new(directory: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            directory: directory.into(),
            builtins: Vec::new(),
            current: RwLock::new(Arc::new(ToolRegistry::new())),
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self::new(settings.directory.clone(), settings.enabled)
    }

    /// Register a tool implemented in Rust alongside the plugins.
    pub fn with_builtin(mut self, tool: Arc<dyn Tool>) -> Self {
        self.builtins.push(tool);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Walk the plugins directory on the blocking pool.
    async fn scan(&self) -> Result<Vec<DiscoveredTool>, ToolError> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || discovery::discover(&directory))
            .await
            .map_err(|e| ToolError::Discovery(format!("scan task failed: {e}")))?
    }

    /// Build a registry from scratch without touching the current snapshot.
    fn build(&self, discovered: Vec<DiscoveredTool>) -> Result<ToolRegistry, ToolError> {
        let mut registry = ToolRegistry::new();
        if !self.enabled {
            return Ok(registry);
        }

        for tool in &self.builtins {
            registry.register(tool.clone());
        }

        for found in discovered {
            if registry.contains(&found.descriptor.name) {
                return Err(ToolError::DuplicateName {
                    name: found.descriptor.name,
                    path: found.descriptor_path,
                });
            }
            registry.register(Arc::new(PluginTool::from(found)));
        }

        Ok(registry)
    }

    /// Rescan the plugins directory and swap in the result.
    ///
    /// Returns the number of tools now available. On error the previous
    /// snapshot stays active.
    pub async fn reload(&self) -> Result<usize, ToolError> {
        match self.scan().await.and_then(|found| self.build(found)) {
            Ok(registry) => {
                let count = registry.len();
                *self.current.write().await = Arc::new(registry);
                debug!(count, dir = %self.directory.display(), "Tool catalog loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Tool reload failed, keeping previous tool set");
                Err(e)
            }
        }
    }

    /// The registry as of the last successful reload.
    pub async fn snapshot(&self) -> Arc<ToolRegistry> {
        self.current.read().await.clone()
    }

    /// Descriptors to advertise to the model, sorted by name.
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        if !self.enabled {
            return Vec::new();
        }
        self.snapshot().await.descriptors()
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("enabled", &self.enabled)
            .field("directory", &self.directory)
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plugboard_core::tool::ToolArguments;

    struct ClockTool;

    #[async_trait]
    impl Tool for ClockTool {
        fn name(&self) -> &str {
            "clock"
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("clock", "Current time", serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, _arguments: ToolArguments) -> Result<String, ToolError> {
            Ok("noon".into())
        }
    }

    fn write_descriptor(dir: &Path, name: &str, body: &str) {
        let plugin_dir = dir.join(name);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(format!("{name}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn reload_combines_builtins_and_plugins() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "weather", r#"{"description": "Weather"}"#);

        let catalog = ToolCatalog::new(dir.path(), true).with_builtin(Arc::new(ClockTool));
        assert_eq!(catalog.reload().await.unwrap(), 2);

        let names: Vec<String> = catalog.list_tools().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["clock", "weather"]);
    }

    #[tokio::test]
    async fn disabled_catalog_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "weather", "{}");

        let catalog = ToolCatalog::new(dir.path(), false).with_builtin(Arc::new(ClockTool));
        assert_eq!(catalog.reload().await.unwrap(), 0);
        assert!(catalog.list_tools().await.is_empty());
        assert!(catalog.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn reload_picks_up_new_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ToolCatalog::new(dir.path(), true);
        assert_eq!(catalog.reload().await.unwrap(), 0);

        write_descriptor(dir.path(), "echo", "{}");
        assert_eq!(catalog.reload().await.unwrap(), 1);
        assert!(catalog.snapshot().await.contains("echo"));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "echo", "{}");
        let catalog = ToolCatalog::new(dir.path(), true);
        catalog.reload().await.unwrap();

        write_descriptor(dir.path(), "broken", "{ nope");
        assert!(catalog.reload().await.is_err());

        let names: Vec<String> = catalog.list_tools().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo"]);
    }

    #[tokio::test]
    async fn plugin_shadowing_builtin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "clock", "{}");

        let catalog = ToolCatalog::new(dir.path(), true).with_builtin(Arc::new(ClockTool));
        assert!(matches!(
            catalog.reload().await.unwrap_err(),
            ToolError::DuplicateName { .. }
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_reloads_share_one_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "echo", "{}");
        let catalog = ToolCatalog::new(dir.path(), true);

        let (a, b, c) = tokio::join!(catalog.reload(), catalog.reload(), catalog.reload());
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
        assert!(catalog.snapshot().await.contains("echo"));
    }

    #[tokio::test]
    async fn missing_directory_yields_builtins_only() {
        let catalog = ToolCatalog::new("/nonexistent/plugins", true).with_builtin(Arc::new(ClockTool));
        assert_eq!(catalog.reload().await.unwrap(), 1);
    }
}
