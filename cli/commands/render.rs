use anyhow::{Context, Result};
use colored::*;
use log;
use rendergit_core::{Config, bytes_human, render_html, render_repository};
use std::path::PathBuf;

use crate::cache::RenderCache;
use crate::cli_args::RenderArgs;
use crate::fetch::{derive_output_path, fetch_repository, short_revision};
use crate::load_config_for_command;
use crate::output::{print_counts_line, write_to_file};

pub fn handle_render_command(args: RenderArgs, quiet: bool) -> Result<()> {
    let mut config = load_config_for_command(&args.config_opts)
        .context("Failed to load configuration for render command")?;
    apply_render_overrides(&mut config, &args);

    let cache = if args.cache {
        Some(RenderCache::from_config(&config).context("Failed to open render cache")?)
    } else {
        None
    };

    let cached = match &cache {
        Some(cache) if !args.refresh => cache
            .get(&args.source.repo)
            .context("Failed to read render cache")?,
        _ => None,
    };

    let html = match cached {
        Some(html) => {
            if !quiet {
                println!("{} Served {} from cache", "✓".green(), args.source.repo.cyan());
            }
            html
        }
        None => {
            let (html, revision) = render_page(&args.source.repo, &config, quiet)?;
            if let Some(cache) = &cache {
                cache
                    .put(&args.source.repo, revision.as_deref(), &html)
                    .context("Failed to store page in render cache")?;
            }
            html
        }
    };

    let out_path: PathBuf = args
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&args.source.repo));
    write_to_file(&out_path, &html)?;
    if !quiet {
        println!(
            "{} Wrote {} to {}",
            "✅".green(),
            bytes_human(html.len() as u64),
            out_path.display().to_string().blue()
        );
    }

    if !args.no_open {
        log::info!("Opening {} in browser", out_path.display());
        open::that(&out_path)
            .with_context(|| format!("Failed to open {} in a browser", out_path.display()))?;
    }
    Ok(())
}

fn apply_render_overrides(config: &mut Config, args: &RenderArgs) {
    if let Some(theme) = &args.theme {
        config.render.theme = theme.clone();
    }
    if args.plain {
        config.render.markdown = false;
        config.render.highlight = false;
    }
    if args.no_stats {
        config.render.include_stats = false;
    }
    if args.no_llm_view {
        config.render.include_flattened_view = false;
    }
}

/// Fetches and renders `repo`, returning the page and the revision it was built from.
fn render_page(repo: &str, config: &Config, quiet: bool) -> Result<(String, Option<String>)> {
    let fetched = fetch_repository(repo, quiet)
        .with_context(|| format!("Failed to fetch repository {}", repo))?;
    if !quiet {
        println!(
            "{} Scanning {} (HEAD: {})",
            "📊".blue(),
            fetched.source.root.display(),
            fetched
                .source
                .revision
                .as_deref()
                .map_or(fetched.source.revision_or_unknown(), short_revision)
        );
    }

    let documents = render_repository(&fetched.source, config)
        .with_context(|| format!("Failed to render repository {}", repo))?;
    if !quiet {
        print_counts_line(&documents.counts);
    }

    let flattened = config
        .render
        .include_flattened_view
        .then(|| documents.flat.to_cxml());
    let html = render_html(&documents.human, flattened.as_deref())
        .context("Failed to build HTML page")?;
    Ok((html, fetched.source.revision.clone()))
}
