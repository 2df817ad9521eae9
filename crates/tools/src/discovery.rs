//! Descriptor discovery — walk a plugins directory for tool schemas.
//!
//! Every `*.json` file below the root is a descriptor. The file stem is the
//! tool name, whatever the file itself says. An executable named `run` or
//! `run.<ext>` next to the descriptor is its entry point.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use plugboard_core::error::ToolError;
use plugboard_core::provider::ToolDescriptor;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How a plugin's entry point is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub path: PathBuf,
    /// `None` means the file is executed directly
    pub interpreter: Option<&'static str>,
}

impl EntryPoint {
    fn for_path(path: PathBuf) -> Self {
        let interpreter = match path.extension().and_then(|e| e.to_str()) {
            Some("sh") => Some("sh"),
            Some("py") => Some("python3"),
            _ => None,
        };
        Self { path, interpreter }
    }
}

/// A descriptor found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredTool {
    pub descriptor: ToolDescriptor,
    pub descriptor_path: PathBuf,
    pub entry_point: Option<EntryPoint>,
}

/// Discover every descriptor below `root`.
///
/// A missing root is not an error: it yields nothing and logs a warning.
/// Unreadable or malformed descriptors, and two descriptors with the same
/// stem, are errors.
pub fn discover(root: &Path) -> Result<Vec<DiscoveredTool>, ToolError> {
    if !root.exists() {
        warn!(dir = %root.display(), "Tools directory not found, no plugins loaded");
        return Ok(Vec::new());
    }

    let mut paths = collect_descriptor_paths(root)?;
    paths.sort();

    let mut seen = HashSet::new();
    let mut tools = Vec::with_capacity(paths.len());

    for path in paths {
        let descriptor = load_descriptor(&path)?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(ToolError::DuplicateName {
                name: descriptor.name,
                path,
            });
        }

        let entry_point = path.parent().and_then(find_entry_point);
        if entry_point.is_none() {
            warn!(tool = %descriptor.name, path = %path.display(), "Descriptor has no run entry point");
        }
        debug!(tool = %descriptor.name, path = %path.display(), "Discovered tool descriptor");

        tools.push(DiscoveredTool {
            descriptor,
            descriptor_path: path,
            entry_point,
        });
    }

    Ok(tools)
}

/// Symlinks are listed but never followed, so a link back up the tree
/// cannot loop.
fn collect_descriptor_paths(root: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| ToolError::Discovery(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path.to_path_buf());
        }
    }
    Ok(out)
}

/// Parse one descriptor file and stamp the file stem in as its name.
pub fn load_descriptor(path: &Path) -> Result<ToolDescriptor, ToolError> {
    let invalid = |reason: String| ToolError::InvalidDescriptor {
        path: path.to_path_buf(),
        reason,
    };

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("file name is not valid UTF-8".into()))?
        .to_string();

    let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

    let object = value
        .as_object_mut()
        .ok_or_else(|| invalid("descriptor must be a JSON object".into()))?;
    object.insert("name".into(), serde_json::Value::String(name));

    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

/// `run` wins over `run.<ext>`; among extensions the first in name order wins.
fn find_entry_point(dir: &Path) -> Option<EntryPoint> {
    let exact = dir.join("run");
    if exact.is_file() {
        return Some(EntryPoint::for_path(exact));
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_stem().and_then(|s| s.to_str()) == Some("run")
                && p.extension().is_some()
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().map(EntryPoint::for_path)
}
