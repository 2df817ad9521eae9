pub mod chat;
pub mod onboard;
pub mod status;
pub mod tools;

use plugboard_config::AppConfig;

/// Load configuration or explain why it could not be loaded.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
