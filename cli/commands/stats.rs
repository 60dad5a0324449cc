use anyhow::{Context, Result};
use log;
use rendergit_core::{AppError, Classifier, Counts, FlatDocument, RepoStats};
use serde::Serialize;
use tiktoken_rs::cl100k_base;

use crate::cli_args::StatsArgs;
use crate::fetch::fetch_repository;
use crate::load_config_for_command;
use crate::output::{print_stats_pretty, print_structured};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    counts: Counts,
    stats: RepoStats,
    estimated_tokens: usize,
}

pub fn handle_stats_command(args: StatsArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.config_opts)
        .context("Failed to load configuration for stats command")?;
    let fetched = fetch_repository(&args.source.repo, quiet)
        .with_context(|| format!("Failed to fetch repository {}", args.source.repo))?;
    let tree = Classifier::from_config(&config)?
        .classify_tree(&fetched.source.root)
        .context("Failed to classify repository files")?;

    let stats = RepoStats::from_records(&tree.records);
    let flat = FlatDocument::from_records(&tree.records);
    let estimated_tokens = estimate_tokens(&flat.to_cxml())?;
    log::debug!("Estimated {} tokens for the flattened document.", estimated_tokens);

    let report = StatsReport {
        counts: tree.counts(),
        stats,
        estimated_tokens,
    };
    if args.format_output.format.is_none() {
        print_stats_pretty(&report.stats, &report.counts, report.estimated_tokens);
        Ok(())
    } else {
        print_structured(&report, &args.format_output, "stats")
    }
}

fn estimate_tokens(text: &str) -> Result<usize> {
    let bpe = cl100k_base().map_err(|e| anyhow::anyhow!(AppError::TikToken(e.to_string())))?;
    Ok(bpe.encode_ordinary(text).len())
}
