//! Implementation of the `autoroute openapi` commands.

use std::fs;

use colored::Colorize;

use crate::catalog;

/// Writes the catalog's API description to `output`, or stdout.
pub fn export(output: Option<String>) -> Result<(), String> {
    let server = super::server_config(None, None)?;
    let dispatcher = catalog::app(&server).build().map_err(|e| e.to_string())?;
    let spec = dispatcher
        .openapi()
        .ok_or_else(|| "API description is not enabled".to_string())?;

    let rendered = serde_json::to_string_pretty(spec)
        .map_err(|e| format!("Failed to serialize API description: {}", e))?;

    match output {
        Some(path) => {
            fs::write(&path, format!("{}\n", rendered))
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            eprintln!("  {} Wrote {}", "✓".green(), path.cyan());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
