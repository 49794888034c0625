//! Tools listing command

use anyhow::Result;
use colored::Colorize;
use relay_core::tools::builtin_registry;
use tracing::info;

/// Show available tools
pub async fn tools_command() -> Result<()> {
    info!("Listing available tools");

    println!("{}\n", "Available Tools".bold());

    let registry = builtin_registry()?;
    for definition in registry.list_definitions() {
        println!("{}", definition.name.cyan().bold());
        println!("   {}", definition.description);
        let parameters = serde_json::to_string_pretty(&definition.parameters.to_json_schema())?;
        for line in parameters.lines() {
            println!("   {}", line.dimmed());
        }
        println!();
    }

    Ok(())
}
