use anyhow::{Context, Result};
use colored::*;
use rendergit_core::{AppError, Config};

use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_file, write_to_stdout};

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let content = Config::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let path = Config::default_config_path().ok_or_else(|| {
        AppError::Config("Could not determine the user config directory".to_string())
    })?;
    if path.exists() && !confirm_overwrite(&path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    write_to_file(&path, &content)?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
