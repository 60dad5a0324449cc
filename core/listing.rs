use crate::output_formats::get_classify_tables;
use log;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Directory listing of `root`, from the external `tree` tool when allowed
/// and available, otherwise from [`generate_tree_fallback`].
pub fn tree_listing(root: &Path, use_tree_command: bool) -> String {
    if use_tree_command {
        match try_tree_command(root) {
            Some(text) => return text,
            None => log::debug!("`tree` unavailable or failed, using built-in listing."),
        }
    }
    generate_tree_fallback(root)
}

fn try_tree_command(root: &Path) -> Option<String> {
    let mut vcs: Vec<&str> = get_classify_tables()
        .vcs_dirs
        .iter()
        .map(String::as_str)
        .collect();
    vcs.sort_unstable();
    let output = Command::new("tree")
        .arg("-a")
        .arg("-I")
        .arg(vcs.join("|"))
        .arg(".")
        .current_dir(root)
        .output()
        .map_err(|e| log::trace!("Failed to spawn `tree`: {}", e))
        .ok()?;
    if !output.status.success() {
        log::trace!("`tree` exited with {}", output.status);
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Root name, then one line per entry: directories before files at each
/// level, each group ordered case-insensitively. VCS metadata directories are
/// skipped and symlinked directories are listed but not entered.
pub fn generate_tree_fallback(root: &Path) -> String {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    let mut lines = vec![root_name];
    walk_level(root, "", &mut lines);
    lines.join("\n")
}

fn walk_level(dir: &Path, prefix: &str, lines: &mut Vec<String>) {
    let vcs_dirs = &get_classify_tables().vcs_dirs;
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            log::warn!("Could not list directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut entries: Vec<(String, bool, PathBuf)> = read_dir
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if is_dir && vcs_dirs.contains(&name) {
                None
            } else {
                Some((name, is_dir, entry.path()))
            }
        })
        .collect();
    entries.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
            .then_with(|| a.0.cmp(&b.0))
    });

    let count = entries.len();
    for (i, (name, is_dir, path)) in entries.into_iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { LAST_BRANCH } else { BRANCH };
        lines.push(format!("{}{}{}", prefix, branch, name));
        if is_dir {
            let extension = if last { SPACE } else { PIPE };
            walk_level(&path, &format!("{}{}", prefix, extension), lines);
        }
    }
}
