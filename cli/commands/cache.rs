use anyhow::{Context, Result};
use colored::*;

use crate::cache::RenderCache;
use crate::cli_args::{CacheAction, CacheArgs};
use crate::load_config_for_command;
use crate::output::print_cache_table;

pub fn handle_cache_command(args: CacheArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.config_opts)
        .context("Failed to load configuration for cache command")?;
    let cache = RenderCache::from_config(&config).context("Failed to open render cache")?;

    match args.action {
        CacheAction::List {} => {
            if !quiet {
                println!("Cache directory: {}", cache.dir().display().to_string().blue());
            }
            print_cache_table(&cache.entries(), |entry| cache.is_expired(entry));
        }
        CacheAction::Prune {} => {
            let removed = cache.prune().context("Failed to prune render cache")?;
            if !quiet {
                println!("{} Pruned {} cached pages", "✓".green(), removed);
            }
        }
        CacheAction::Clear {} => {
            let removed = cache.clear().context("Failed to clear render cache")?;
            if !quiet {
                println!("{} Removed {} cached pages", "✓".green(), removed);
            }
        }
    }
    Ok(())
}
