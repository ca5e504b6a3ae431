//! Config command handlers

use crate::cli::ConfigInitArgs;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../studycam.example.toml");

/// Handle `studycam config init` command
///
/// Writes the annotated example configuration, creating missing parent
/// directories, and reports where history will be kept with it.
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<String, Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, EXAMPLE_CONFIG)?;

    let config = super::load_config(&args.output)?;

    Ok(format!(
        "✓ Configuration file created: {}\n  History file: {}\n  Set GEMINI_API_KEY or switch [analysis] provider to \"lmstudio\" before running `studycam watch`.",
        args.output.display(),
        config.history.resolved_path().display()
    ))
}
