//! `plugboard tools` — List the tools the model will be offered.

use plugboard_tools::discover;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let dir = &config.tools.directory;

    println!("Plugboard Tools");
    println!("===============");
    println!("  Directory: {}", dir.display());

    if !config.tools.enabled {
        println!("\n  Tool support is disabled ([tools] enabled = false)");
        return Ok(());
    }

    let found = discover(dir)?;
    if found.is_empty() {
        println!("\n  No tool descriptors found.");
        return Ok(());
    }

    println!();
    for tool in &found {
        let entry = match &tool.entry_point {
            Some(entry) => entry.path.display().to_string(),
            None => "(no run entry point)".to_string(),
        };
        println!("  {}", tool.descriptor.name);
        if !tool.descriptor.description.is_empty() {
            println!("      {}", tool.descriptor.description);
        }
        println!("      entry: {entry}");
    }
    println!("\n  {} tool(s)", found.len());

    Ok(())
}
