use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use rendergit_core::{Counts, Decision, FileRecord, RepoStats, bytes_human, output_formats};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::cache::CacheEntry;
use crate::cli_args::StructuredOutputOpts;

/// Serialises `data` in the format picked by `format_opts` and prints it.
pub fn print_structured<T: Serialize>(
    data: &T,
    format_opts: &StructuredOutputOpts,
    root_name: &str,
) -> Result<()> {
    let format = format_opts.format.as_deref().unwrap_or("json");
    let content = match format.to_lowercase().as_str() {
        "yaml" | "yml" => output_formats::serialize_to_yaml(data)?,
        "xml" => output_formats::serialize_to_xml(data, root_name)?,
        _ => output_formats::serialize_to_json(data, !format_opts.json_minify)?,
    };
    write_to_stdout(&content)
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_counts_line(counts: &Counts) {
    println!(
        "{} {} files total ({} rendered, {} binary, {} too large, {} ignored)",
        "✓".green(),
        counts.total.to_string().cyan(),
        counts.included.to_string().green(),
        counts.binary.to_string().yellow(),
        counts.too_large.to_string().yellow(),
        counts.ignored.to_string().dimmed()
    );
}

fn decision_cell(decision: Decision) -> Cell {
    let color = match decision {
        Decision::Included => Color::Green,
        Decision::ExcludedBinary | Decision::ExcludedTooLarge => Color::Yellow,
        Decision::ExcludedIgnored => Color::DarkGrey,
    };
    Cell::new(decision.reason()).fg(color)
}

pub fn print_scan_table(records: &[&FileRecord], counts: &Counts) {
    if records.is_empty() {
        println!("{}", "(No files to show)".yellow());
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Decision").fg(Color::Green),
        ]);
        for record in records {
            table.add_row(vec![
                Cell::new(&record.relative_path).fg(Color::Cyan),
                Cell::new(bytes_human(record.size_bytes))
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                decision_cell(record.decision),
            ]);
        }
        println!("{table}");
    }
    print_counts_line(counts);
}

pub fn print_stats_pretty(stats: &RepoStats, counts: &Counts, estimated_tokens: usize) {
    println!();
    println!("{}", " Repository Statistics ".green().bold().underline());
    let rows = [
        ("Rendered Files:", stats.files.to_string()),
        ("Skipped Files:", counts.skipped().to_string()),
        ("Total Size:", bytes_human(stats.total_size)),
        ("Average Size:", bytes_human(stats.average_size)),
        ("Largest File:", bytes_human(stats.largest_size)),
        ("Max Depth:", format!("{} levels", stats.max_depth)),
        ("Root Files:", stats.root_files.to_string()),
        ("Nested Files:", stats.nested_files.to_string()),
        ("Est. Tokens:", estimated_tokens.to_string()),
    ];
    for (label, value) in rows {
        println!("{:<20} {}", label.green(), value.cyan());
    }

    if !stats.languages.is_empty() {
        println!("\n{}", " Languages ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Language").fg(Color::Green),
            Cell::new("Files").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
        ]);
        for lang in &stats.languages {
            table.add_row(vec![
                Cell::new(&lang.name).fg(Color::Cyan),
                Cell::new(lang.files).set_alignment(CellAlignment::Right),
                Cell::new(bytes_human(lang.size_bytes))
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
            ]);
        }
        println!("{table}");
    }

    if !stats.extensions.is_empty() {
        println!("\n{}", " Top Extensions ".green().bold().underline());
        let line = stats
            .extensions
            .iter()
            .map(|e| format!("{} {}", e.extension.cyan(), e.files))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line);
    }
    println!();
}

pub fn print_cache_table(entries: &[(String, CacheEntry)], is_expired: impl Fn(&CacheEntry) -> bool) {
    if entries.is_empty() {
        println!("{}", "(Cache is empty)".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Repository").fg(Color::Green),
        Cell::new("Commit").fg(Color::Green),
        Cell::new("Stored").fg(Color::Green),
        Cell::new("Last Used").fg(Color::Green),
        Cell::new("Key").fg(Color::Green),
    ]);
    for (key, entry) in entries {
        let repo_cell = if is_expired(entry) {
            Cell::new(format!("{} (expired)", entry.url)).fg(Color::DarkGrey)
        } else {
            Cell::new(&entry.url).fg(Color::Cyan)
        };
        table.add_row(vec![
            repo_cell,
            Cell::new(&entry.commit),
            Cell::new(entry.stored_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(entry.last_accessed.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&key[..12.min(key.len())]).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
}

/// Asks before replacing `path`. In quiet mode nothing is asked and the
/// overwrite is refused with an error.
pub fn confirm_overwrite(path: &Path, quiet: bool) -> Result<bool> {
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} File already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}
