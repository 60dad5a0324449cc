use anyhow::{Context, Result};
use rendergit_core::{Classifier, Counts, FileRecord};
use serde::Serialize;

use crate::cli_args::ScanArgs;
use crate::fetch::fetch_repository;
use crate::load_config_for_command;
use crate::output::{print_scan_table, print_structured};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanReport<'a> {
    repository: &'a str,
    max_bytes: u64,
    counts: Counts,
    files: Vec<&'a FileRecord>,
}

pub fn handle_scan_command(args: ScanArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.config_opts)
        .context("Failed to load configuration for scan command")?;
    let fetched = fetch_repository(&args.source.repo, quiet)
        .with_context(|| format!("Failed to fetch repository {}", args.source.repo))?;
    let classifier = Classifier::from_config(&config)?;
    let tree = classifier
        .classify_tree(&fetched.source.root)
        .context("Failed to classify repository files")?;

    let counts = tree.counts();
    let files: Vec<&FileRecord> = tree
        .records
        .iter()
        .filter(|r| !args.excluded || !r.decision.is_included())
        .collect();

    if args.format_output.format.is_none() {
        print_scan_table(&files, &counts);
        Ok(())
    } else {
        let report = ScanReport {
            repository: &args.source.repo,
            max_bytes: classifier.max_bytes(),
            counts,
            files,
        };
        print_structured(&report, &args.format_output, "scan")
    }
}
