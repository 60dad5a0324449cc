mod cache;
mod cli_args;
mod commands;
mod fetch;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::process;

use cli_args::{Cli, Commands, ConfigOpts};
use rendergit_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::TomlSerialize(_)) => 1,
                Some(AppError::Asset(_)) => 1,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::DirCreation { .. }) => 2,
                Some(AppError::RootNotFound(_)) => 2,
                Some(AppError::Glob(_)) => 2,
                Some(AppError::Fetch(_)) => 3,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::DurationParse(_)) => 5,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(AppError::YamlError(_)) => 6,
                Some(AppError::XmlSerialize(_)) => 6,
                Some(AppError::FlatParse(_)) => 6,
                Some(AppError::Cache(_)) => 7,
                Some(AppError::TikToken(_)) => 8,
                Some(_) => 1,
                None => 1,
            };

            // Config and usage errors are printed even when quiet.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Render(args) => {
                log::debug!("Executing 'render' command...");
                commands::render::handle_render_command(args, quiet)?;
            }
            Commands::Flatten(args) => {
                log::debug!("Executing 'flatten' command...");
                commands::flatten::handle_flatten_command(args, quiet)?;
            }
            Commands::Scan(args) => {
                log::debug!("Executing 'scan' command...");
                commands::scan::handle_scan_command(args, quiet)?;
            }
            Commands::Stats(args) => {
                log::debug!("Executing 'stats' command...");
                commands::stats::handle_stats_command(args, quiet)?;
            }
            Commands::Cache(args) => {
                log::debug!("Executing 'cache' command...");
                commands::cache::handle_cache_command(args, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

fn merge_config_with_cli_overrides(mut config: Config, opts: &ConfigOpts) -> Config {
    log::trace!("Applying CLI overrides to config...");
    if let Some(max_bytes) = opts.max_bytes {
        config.general.max_bytes = max_bytes;
    }
    if !opts.ignore.is_empty() {
        config.general.ignore.extend(opts.ignore.iter().cloned());
    }
    if opts.no_tree_command {
        config.tree.use_tree_command = false;
    }
    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file selected by `opts` (or defaults) and applies the
/// shared CLI overrides. Command-specific overrides are applied by the caller.
pub fn load_config_for_command(opts: &ConfigOpts) -> Result<Config> {
    let config_path = Config::resolve_config_path(opts.config.as_ref(), opts.no_config)
        .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    Ok(merge_config_with_cli_overrides(config, opts))
}
