//! Configuration view and validation commands: `taskboard config`.

use anyhow::Result;
use console::style;
use std::path::Path;

use taskboard::config::{CliOverrides, TaskboardToml};

use super::super::ConfigCommands;

pub fn cmd_config(
    config_path: &Path,
    overrides: &CliOverrides,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Taskboard Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {} (using defaults)", config_path.display());
            }
            println!();

            let config = TaskboardToml::resolve(config_path, overrides)?;
            println!("Effective values (with env/CLI overrides):");
            println!();
            print!("{}", config.to_toml_string()?);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = TaskboardToml::resolve(config_path, overrides)?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("{} Configuration is valid.", style("✓").green());
            } else {
                println!("{}", style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }

            TaskboardToml::default().save(config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, cors_permissive");
            println!("  - [database] path");
            println!("  - [logging] level, format, dir");
            println!();
        }
    }

    Ok(())
}
