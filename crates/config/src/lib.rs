//! Configuration loading, validation, and management for Plugboard.
//!
//! Loads configuration from `~/.plugboard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder instructions used when no prompt file exists.
pub const DEFAULT_INITIAL_PROMPT: &str = "You are a helpful assistant in a group chat. \
Use the available functions when they help answer the user.";

/// The root configuration structure.
///
/// Maps directly to `~/.plugboard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Display name used in failure notices
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Completion endpoint settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Tool discovery and invocation
    #[serde(default)]
    pub tools: ToolSettings,

    /// History and loop bounds
    #[serde(default)]
    pub conversation: ConversationSettings,

    /// Base system instructions
    #[serde(default)]
    pub prompt: PromptSettings,
}

fn default_bot_name() -> String {
    "Plugboard".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("bot_name", &self.bot_name)
            .field("provider", &self.provider)
            .field("tools", &self.tools)
            .field("conversation", &self.conversation)
            .field("prompt", &self.prompt)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible API, or the full `/chat/completions` URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on a single completion round trip
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// When false, no tools are advertised to the model
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory scanned for `<name>.json` descriptors
    #[serde(default = "default_tools_dir")]
    pub directory: PathBuf,

    /// Re-scan the directory before every completion request
    #[serde(default = "default_true")]
    pub rescan_each_turn: bool,

    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_tools_dir() -> PathBuf {
    PathBuf::from("plugins")
}
fn default_invoke_timeout() -> u64 {
    60
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_tools_dir(),
            rescan_each_turn: true,
            invoke_timeout_secs: default_invoke_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// Turns kept after each terminal reply
    #[serde(default = "default_keep_last_n")]
    pub keep_last_n: usize,

    /// Tool calls allowed in one chain before giving up
    #[serde(default = "default_max_tool_depth")]
    pub max_tool_depth: u32,
}

fn default_keep_last_n() -> usize {
    8
}
fn default_max_tool_depth() -> u32 {
    10
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            keep_last_n: default_keep_last_n(),
            max_tool_depth: default_max_tool_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSettings {
    /// File holding the base instructions; relative paths resolve against
    /// the working directory
    #[serde(default = "default_prompt_file")]
    pub initial_prompt_file: PathBuf,

    /// Use this text instead of reading the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_prompt_file() -> PathBuf {
    PathBuf::from("initial_prompt.txt")
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            initial_prompt_file: default_prompt_file(),
            system_prompt_override: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.plugboard/config.toml).
    ///
    /// Environment overrides:
    /// - `PLUGBOARD_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `LLM_ENDPOINT` — provider base URL or full completions URL
    /// - `LLM_MODEL` — model identifier
    /// - `PLUGBOARD_TOOLS_DIR` — tools directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PLUGBOARD_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(url) = lookup("LLM_ENDPOINT") {
            self.provider.api_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.provider.model = model;
        }
        if let Some(dir) = lookup("PLUGBOARD_TOOLS_DIR") {
            self.tools.directory = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".plugboard")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.keep_last_n < 2 {
            return Err(ConfigError::ValidationError(
                "conversation.keep_last_n must be at least 2".into(),
            ));
        }

        if self.conversation.max_tool_depth == 0 {
            return Err(ConfigError::ValidationError(
                "conversation.max_tool_depth must be at least 1".into(),
            ));
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Resolve the base instruction template.
    ///
    /// The override wins; otherwise the prompt file is read. A missing file
    /// falls back to [`DEFAULT_INITIAL_PROMPT`], an unreadable one is an error.
    pub fn load_initial_prompt(&self) -> Result<String, ConfigError> {
        if let Some(text) = &self.prompt.system_prompt_override {
            return Ok(text.clone());
        }

        let path = &self.prompt.initial_prompt_file;
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Initial prompt file not found, using built-in instructions"
            );
            return Ok(DEFAULT_INITIAL_PROMPT.to_string());
        }

        std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    /// The file to re-read for the base prompt before each request.
    ///
    /// `None` when an override is configured.
    pub fn prompt_file(&self) -> Option<&Path> {
        match self.prompt.system_prompt_override {
            Some(_) => None,
            None => Some(&self.prompt.initial_prompt_file),
        }
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            bot_name: default_bot_name(),
            provider: ProviderSettings::default(),
            tools: ToolSettings::default(),
            conversation: ConversationSettings::default(),
            prompt: PromptSettings::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conversation.keep_last_n, 8);
        assert_eq!(config.conversation.max_tool_depth, 10);
        assert!(config.tools.enabled);
        assert_eq!(config.tools.directory, PathBuf::from("plugins"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.conversation.keep_last_n, config.conversation.keep_last_n);
    }

    #[test]
    fn keep_last_n_below_two_rejected() {
        let mut config = AppConfig::default();
        config.conversation.keep_last_n = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tool_depth_rejected() {
        let mut config = AppConfig::default();
        config.conversation.max_tool_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.bot_name, "Plugboard");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
bot_name = "Sparky"

[tools]
enabled = false

[conversation]
keep_last_n = 12
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.bot_name, "Sparky");
        assert!(!config.tools.enabled);
        assert_eq!(config.conversation.keep_last_n, 12);
        assert_eq!(config.conversation.max_tool_depth, 10);
        assert_eq!(config.provider.request_timeout_secs, 120);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bot_name = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_ENDPOINT", "http://localhost:8080/v1"),
            ("LLM_MODEL", "local-model"),
            ("PLUGBOARD_TOOLS_DIR", "/opt/plugins"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.provider.api_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.model, "local-model");
        assert_eq!(config.tools.directory, PathBuf::from("/opt/plugins"));
    }

    #[test]
    fn configured_key_beats_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|k| (k == "OPENAI_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn prompt_override_wins() {
        let mut config = AppConfig::default();
        config.prompt.system_prompt_override = Some("Be brief.".into());
        assert_eq!(config.load_initial_prompt().unwrap(), "Be brief.");
        assert!(config.prompt_file().is_none());

        config.prompt.system_prompt_override = None;
        assert_eq!(
            config.prompt_file(),
            Some(config.prompt.initial_prompt_file.as_path())
        );
    }

    #[test]
    fn prompt_file_read_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();

        config.prompt.initial_prompt_file = dir.path().join("missing.txt");
        assert_eq!(config.load_initial_prompt().unwrap(), DEFAULT_INITIAL_PROMPT);

        let path = dir.path().join("initial_prompt.txt");
        std::fs::write(&path, "You are Sparky.").unwrap();
        config.prompt.initial_prompt_file = path;
        assert_eq!(config.load_initial_prompt().unwrap(), "You are Sparky.");
    }
}
