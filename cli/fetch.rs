use log;
use rendergit_core::{AppError, RepoSource, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const REMOTE_PREFIXES: [&str; 6] = ["http://", "https://", "ssh://", "git://", "git@", "file://"];

/// A repository ready to scan. A cloned checkout lives in a temporary
/// directory that is removed when this value is dropped.
pub struct FetchedRepo {
    pub source: RepoSource,
    _checkout: Option<TempDir>,
}

pub fn is_remote(repo: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|prefix| repo.starts_with(prefix))
}

/// Clones `repo` when it looks like a remote URL, otherwise uses it as a
/// local directory. The revision comes from `git rev-parse HEAD` either way.
pub fn fetch_repository(repo: &str, quiet: bool) -> Result<FetchedRepo> {
    if !is_remote(repo) {
        let root = PathBuf::from(repo);
        if !root.is_dir() {
            return Err(AppError::RootNotFound(root));
        }
        let root = root.canonicalize().map_err(|e| AppError::FileRead {
            path: root.clone(),
            source: e,
        })?;
        let revision = git_head_commit(&root);
        log::info!("Using local repository: {}", root.display());
        return Ok(FetchedRepo {
            source: RepoSource {
                identifier: repo.to_string(),
                root,
                revision,
            },
            _checkout: None,
        });
    }

    let tmp = tempfile::Builder::new()
        .prefix("rendergit_")
        .tempdir()
        .map_err(|e| AppError::Fetch(format!("Failed to create temporary directory: {}", e)))?;
    let root = tmp.path().join("repo");
    if !quiet {
        eprintln!("Cloning {} into {}", repo, root.display());
    }
    git_clone(repo, &root)?;
    let revision = git_head_commit(&root);
    log::info!(
        "Clone complete (HEAD: {})",
        revision.as_deref().map_or("(unknown)", short_revision)
    );
    Ok(FetchedRepo {
        source: RepoSource {
            identifier: repo.to_string(),
            root,
            revision,
        },
        _checkout: Some(tmp),
    })
}

fn git_clone(url: &str, dst: &Path) -> Result<()> {
    log::debug!("Running: git clone --depth 1 {} {}", url, dst.display());
    let output = Command::new("git")
        .args(["clone", "--depth", "1", url])
        .arg(dst)
        .output()
        .map_err(|e| AppError::Fetch(format!("Failed to run git: {}", e)))?;
    if !output.status.success() {
        return Err(AppError::Fetch(format!(
            "git clone of {} failed ({}): {}",
            url,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// `None` when `dir` is not a git checkout or git is unavailable.
pub fn git_head_commit(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .map_err(|e| log::debug!("git rev-parse could not run: {}", e))
        .ok()?;
    if !output.status.success() {
        log::debug!("git rev-parse failed in {}", dir.display());
        return None;
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if head.is_empty() { None } else { Some(head) }
}

pub fn short_revision(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}

/// `<temp dir>/<name>.html`, where `name` is the last URL or path segment
/// without a `.git` suffix.
pub fn derive_output_path(repo: &str) -> PathBuf {
    std::env::temp_dir().join(derive_output_filename(repo))
}

fn derive_output_filename(repo: &str) -> String {
    let trimmed = repo.trim_end_matches('/');
    let mut parts = trimmed.rsplit(['/', ':']);
    let name = match (parts.next(), parts.next()) {
        (Some(last), Some(_)) => last.strip_suffix(".git").unwrap_or(last),
        _ => "",
    };
    if name.is_empty() || name == "." || name == ".." {
        "repo.html".to_string()
    } else {
        format!("{}.html", name)
    }
}
