//! `plugboard onboard` — First-time setup.

use std::path::Path;

use plugboard_config::{AppConfig, DEFAULT_INITIAL_PROMPT};

const EXAMPLE_DESCRIPTOR: &str = r#"{
  "description": "Repeat the given text back verbatim",
  "parameters": {
    "type": "object",
    "properties": {
      "text": { "type": "string", "description": "Text to repeat" }
    },
    "required": ["text"]
  }
}
"#;

const EXAMPLE_RUNNER: &str = r#"#!/bin/sh
# Arguments arrive on stdin as one JSON object; stdout is the result.
cat
"#;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Plugboard — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let config = if config_path.exists() {
        println!("  Config already exists at: {}", config_path.display());
        AppConfig::load_from(&config_path)?
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
        AppConfig::default()
    };

    let prompt_path = &config.prompt.initial_prompt_file;
    if write_if_missing(prompt_path, DEFAULT_INITIAL_PROMPT)? {
        println!("  Created {}", prompt_path.display());
    }

    let example_dir = config.tools.directory.join("echo");
    if !config.tools.directory.exists() {
        std::fs::create_dir_all(&example_dir)?;
        write_if_missing(&example_dir.join("echo.json"), EXAMPLE_DESCRIPTOR)?;
        write_if_missing(&example_dir.join("run.sh"), EXAMPLE_RUNNER)?;
        println!("  Created example plugin: {}", example_dir.display());
    }

    println!("\n  Next steps:");
    println!("   1. Add your API key to {}", config_path.display());
    println!("   2. Edit {} to shape the bot", prompt_path.display());
    println!("   3. Run: plugboard chat\n");

    Ok(())
}

/// Returns whether the file was written.
fn write_if_missing(path: &Path, content: &str) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}
