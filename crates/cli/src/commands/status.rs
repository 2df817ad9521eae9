//! `plugboard status` — Show effective configuration.

use plugboard_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    let prompt_source = match &config.prompt.system_prompt_override {
        Some(_) => "override in config.toml".to_string(),
        None => config.prompt.initial_prompt_file.display().to_string(),
    };

    println!("Plugboard Status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Bot name:     {}", config.bot_name);
    println!("  Endpoint:     {}", config.provider.api_url);
    println!("  Model:        {}", config.provider.model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Timeout:      {}s", config.provider.request_timeout_secs);
    println!("  Tools:        {}", if config.tools.enabled { "enabled" } else { "disabled" });
    println!("  Tools dir:    {}", config.tools.directory.display());
    println!("  Rescan:       {}", if config.tools.rescan_each_turn { "every turn" } else { "startup only" });
    println!("  Tool timeout: {}s", config.tools.invoke_timeout_secs);
    println!("  Keep turns:   {}", config.conversation.keep_last_n);
    println!("  Tool depth:   {}", config.conversation.max_tool_depth);
    println!("  Prompt:       {prompt_source}");

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file — run `plugboard onboard` first");
    }

    Ok(())
}
