use anyhow::{Context, Result};
use colored::*;
use rendergit_core::{Classifier, FlatDocument, FlatFormat};
use std::str::FromStr;

use crate::cli_args::FlattenArgs;
use crate::fetch::fetch_repository;
use crate::load_config_for_command;
use crate::output::{write_to_file, write_to_stdout};

pub fn handle_flatten_command(args: FlattenArgs, quiet: bool) -> Result<()> {
    let mut config = load_config_for_command(&args.config_opts)
        .context("Failed to load configuration for flatten command")?;
    if let Some(format) = &args.format {
        config.flatten.format = FlatFormat::from_str(format)?;
    }
    if args.json_minify {
        config.flatten.json_minify = true;
    }

    let fetched = fetch_repository(&args.source.repo, quiet)
        .with_context(|| format!("Failed to fetch repository {}", args.source.repo))?;
    let tree = Classifier::from_config(&config)?
        .classify_tree(&fetched.source.root)
        .context("Failed to classify repository files")?;

    let flat = FlatDocument::from_records(&tree.records);
    let content = flat
        .to_format(config.flatten.format, config.flatten.json_minify)
        .context("Failed to serialize flattened document")?;

    match &args.output {
        Some(path) => {
            write_to_file(path, &content)?;
            if !quiet {
                println!(
                    "{} Flattened {} files ({}) to: {}",
                    "✅".green(),
                    flat.len(),
                    config.flatten.format,
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(&content)?,
    }
    Ok(())
}
