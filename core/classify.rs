use crate::config::Config;
use crate::error::{AppError, Result};
use crate::output_formats::{dotted_extension, get_classify_tables};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log;
use rayon::prelude::*;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// How many leading bytes the binary sniffing reads.
pub const SNIFF_BYTES: u64 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "snake_case"))]
pub enum Decision {
    Included,
    ExcludedBinary,
    ExcludedTooLarge,
    ExcludedIgnored,
}

impl Decision {
    pub fn is_included(self) -> bool {
        matches!(self, Decision::Included)
    }

    pub fn reason(self) -> &'static str {
        match self {
            Decision::Included => "ok",
            Decision::ExcludedBinary => "binary",
            Decision::ExcludedTooLarge => "too_large",
            Decision::ExcludedIgnored => "ignored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct FileRecord {
    #[cfg_attr(feature = "serde_support", serde(skip))]
    pub absolute_path: PathBuf,
    /// Slash-separated path relative to the scanned root. Unique per scan.
    pub relative_path: String,
    pub size_bytes: u64,
    pub decision: Decision,
}

impl FileRecord {
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Number of directory components above the file (`0` for root-level files).
    pub fn depth(&self) -> usize {
        self.relative_path.matches('/').count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct Counts {
    pub total: usize,
    pub included: usize,
    pub binary: usize,
    pub too_large: usize,
    pub ignored: usize,
}

impl Counts {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut counts = Counts {
            total: records.len(),
            ..Counts::default()
        };
        for record in records {
            match record.decision {
                Decision::Included => counts.included += 1,
                Decision::ExcludedBinary => counts.binary += 1,
                Decision::ExcludedTooLarge => counts.too_large += 1,
                Decision::ExcludedIgnored => counts.ignored += 1,
            }
        }
        counts
    }

    pub fn skipped(&self) -> usize {
        self.total - self.included
    }
}

/// Every regular file under `root`, classified, in canonical order.
#[derive(Debug, Clone)]
pub struct ClassifiedTree {
    pub root: PathBuf,
    pub records: Vec<FileRecord>,
}

impl ClassifiedTree {
    pub fn counts(&self) -> Counts {
        Counts::from_records(&self.records)
    }

    pub fn included(&self) -> impl Iterator<Item = &FileRecord> {
        self.with_decision(Decision::Included)
    }

    pub fn with_decision(&self, decision: Decision) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(move |r| r.decision == decision)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    max_bytes: u64,
    ignore_set: GlobSet,
}

impl Classifier {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            ignore_set: GlobSet::empty(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.general.max_bytes).with_ignore_patterns(&config.general.ignore)
    }

    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_set = build_glob_set_from_vec(patterns)?;
        Ok(self)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn classify_tree(&self, root: &Path) -> Result<ClassifiedTree> {
        if !root.is_dir() {
            return Err(AppError::RootNotFound(root.to_path_buf()));
        }
        log::info!("Classifying files under: {}", root.display());

        let mut candidates: Vec<(PathBuf, String)> = Vec::new();
        for entry_result in WalkDir::new(root).follow_links(false) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Error walking directory: {}", e);
                    continue;
                }
            };
            // Symlinks report their own file type here, so they never pass.
            if !entry.file_type().is_file() {
                continue;
            }
            match relative_slash_path(entry.path(), root) {
                Some(rel) => candidates.push((entry.path().to_path_buf(), rel)),
                None => log::warn!("Could not get relative path for: {}", entry.path().display()),
            }
        }
        log::debug!("Walk found {} regular files.", candidates.len());

        let mut records: Vec<FileRecord> = candidates
            .into_par_iter()
            .map(|(path, rel)| self.classify_file(path, rel))
            .collect();
        sort_canonical(&mut records);
        if disambiguate_duplicates(&mut records) {
            sort_canonical(&mut records);
        }

        let tree = ClassifiedTree {
            root: root.to_path_buf(),
            records,
        };
        let counts = tree.counts();
        log::info!(
            "Classified {} files ({} included, {} binary, {} too large, {} ignored).",
            counts.total,
            counts.included,
            counts.binary,
            counts.too_large,
            counts.ignored
        );
        Ok(tree)
    }

    fn classify_file(&self, path: PathBuf, rel: String) -> FileRecord {
        let size = match path.metadata() {
            Ok(meta) => Some(meta.len()),
            Err(e) => {
                log::debug!("Could not stat {}: {}", path.display(), e);
                None
            }
        };
        let decision = self.decide(&path, &rel, size);
        log::trace!("{} -> {}", rel, decision.reason());
        FileRecord {
            absolute_path: path,
            relative_path: rel,
            size_bytes: size.unwrap_or(0),
            decision,
        }
    }

    /// First match wins: ignored, too large, binary, otherwise included.
    /// A failed stat (`size == None`) degrades to binary.
    pub fn decide(&self, path: &Path, rel: &str, size: Option<u64>) -> Decision {
        if is_vcs_path(rel) || self.ignore_set.is_match(rel) {
            return Decision::ExcludedIgnored;
        }
        let Some(size) = size else {
            return Decision::ExcludedBinary;
        };
        if size > self.max_bytes {
            return Decision::ExcludedTooLarge;
        }
        if looks_binary(path) {
            return Decision::ExcludedBinary;
        }
        Decision::Included
    }
}

/// True when any segment of the slash-separated path, the file name included,
/// is named for a VCS control directory. Submodule checkouts keep a `.git`
/// file rather than a directory.
pub fn is_vcs_path(rel: &str) -> bool {
    let vcs_dirs = &get_classify_tables().vcs_dirs;
    rel.split('/').any(|seg| vcs_dirs.contains(seg))
}

pub fn has_binary_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(dotted_extension)
        .is_some_and(|ext| get_classify_tables().binary_extensions.contains(&ext))
}

/// Extension table first, then a sniff of the first [`SNIFF_BYTES`] bytes.
/// Unreadable files count as binary.
pub fn looks_binary(path: &Path) -> bool {
    if has_binary_extension(path) {
        return true;
    }
    let mut chunk = Vec::with_capacity(SNIFF_BYTES as usize);
    let read = File::open(path).and_then(|f| f.take(SNIFF_BYTES).read_to_end(&mut chunk));
    if let Err(e) = read {
        log::debug!("Treating unreadable file as binary: {} ({})", path.display(), e);
        return true;
    }
    if chunk.contains(&0) {
        return true;
    }
    match std::str::from_utf8(&chunk) {
        Ok(_) => false,
        // A multi-byte character cut off by the sniff limit is not evidence of binary content.
        Err(e) => !(e.error_len().is_none() && chunk.len() as u64 == SNIFF_BYTES),
    }
}

fn relative_slash_path(path: &Path, root: &Path) -> Option<String> {
    let rel = pathdiff::diff_paths(path, root)?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| match c {
            Component::Normal(name) => Some(path_segment(name)),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Names that are not valid UTF-8 keep their undecodable bytes as `\xNN`
/// escapes, so two such names never share a key.
fn path_segment(name: &OsStr) -> String {
    if let Some(text) = name.to_str() {
        return text.to_string();
    }
    let escaped = escape_invalid_utf8(name);
    log::warn!("File name is not valid UTF-8, recorded as: {}", escaped);
    escaped
}

#[cfg(unix)]
fn escape_invalid_utf8(name: &OsStr) -> String {
    use std::os::unix::ffi::OsStrExt;
    let mut out = String::new();
    for chunk in name.as_bytes().utf8_chunks() {
        out.push_str(chunk.valid());
        for byte in chunk.invalid() {
            out.push_str(&format!("\\x{:02X}", byte));
        }
    }
    out
}

#[cfg(not(unix))]
fn escape_invalid_utf8(name: &OsStr) -> String {
    name.to_string_lossy().into_owned()
}

fn sort_canonical(records: &mut [FileRecord]) {
    records.par_sort_unstable_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then_with(|| a.absolute_path.cmp(&b.absolute_path))
    });
}

/// Suffixes `~2`, `~3`, ... onto repeated relative paths. Returns whether any
/// record was renamed.
fn disambiguate_duplicates(records: &mut [FileRecord]) -> bool {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut renamed = false;
    for record in records.iter_mut() {
        if seen.insert(record.relative_path.clone()) {
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{}~{}", record.relative_path, n);
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        log::warn!(
            "Duplicate path {} for {}, recorded as {}",
            record.relative_path,
            record.absolute_path.display(),
            unique
        );
        seen.insert(unique.clone());
        record.relative_path = unique;
        renamed = true;
    }
    renamed
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        let glob = Glob::new(&processed_pattern).map_err(|e| {
            log::error!("Invalid glob pattern \"{}\": {}", pattern_str, e);
            AppError::Glob(format!(
                "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                pattern_str, processed_pattern, e
            ))
        })?;
        log::trace!("Adding ignore pattern: {}", processed_pattern);
        builder.add(glob);
    }
    let set = builder
        .build()
        .inspect_err(|e| log::error!("Error building glob set: {}", e))?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcs_detection_checks_every_segment() {
        assert!(is_vcs_path(".git/HEAD"));
        assert!(is_vcs_path("vendor/lib/.git/config"));
        assert!(is_vcs_path(".hg/store/data"));
        assert!(!is_vcs_path(".gitignore"));
        assert!(is_vcs_path("src/.git"));
        assert!(is_vcs_path(".git"));
        assert!(!is_vcs_path("docs/git/notes.md"));
    }

    #[test]
    fn extension_table_is_case_insensitive() {
        assert!(has_binary_extension(Path::new("assets/LOGO.PNG")));
        assert!(has_binary_extension(Path::new("fonts/a.woff2")));
        assert!(!has_binary_extension(Path::new("src/main.rs")));
        assert!(!has_binary_extension(Path::new("Makefile")));
    }

    #[test]
    fn ignored_takes_precedence_over_missing_stat() {
        let classifier = Classifier::new(10);
        let path = Path::new("/nonexistent/.git/HEAD");
        assert_eq!(
            classifier.decide(path, ".git/HEAD", None),
            Decision::ExcludedIgnored
        );
        assert_eq!(
            classifier.decide(Path::new("/nonexistent/a.txt"), "a.txt", None),
            Decision::ExcludedBinary
        );
        assert_eq!(
            classifier.decide(Path::new("/nonexistent/a.txt"), "a.txt", Some(11)),
            Decision::ExcludedTooLarge
        );
    }

    #[test]
    fn ignore_patterns_apply_to_relative_paths() {
        let classifier = Classifier::new(100)
            .with_ignore_patterns(&["node_modules/".to_string(), "*.lock".to_string()])
            .unwrap();
        assert_eq!(
            classifier.decide(Path::new("x"), "node_modules/a/index.js", Some(1)),
            Decision::ExcludedIgnored
        );
        assert_eq!(
            classifier.decide(Path::new("x"), "Cargo.lock", Some(1)),
            Decision::ExcludedIgnored
        );
    }

    #[test]
    fn invalid_ignore_pattern_is_an_error() {
        let err = Classifier::new(1)
            .with_ignore_patterns(&["a[".to_string()])
            .unwrap_err();
        assert!(matches!(err, AppError::Glob(_)));
    }

    #[test]
    fn repeated_paths_get_distinct_keys() {
        let mk = |rel: &str, abs: &str| FileRecord {
            absolute_path: PathBuf::from(abs),
            relative_path: rel.to_string(),
            size_bytes: 1,
            decision: Decision::Included,
        };
        let mut records = vec![
            mk("a.txt", "/r/a1"),
            mk("a.txt", "/r/a2"),
            mk("a.txt", "/r/a3"),
            mk("a.txt~2", "/r/a4"),
            mk("b.txt", "/r/b"),
        ];
        sort_canonical(&mut records);
        assert!(disambiguate_duplicates(&mut records));
        sort_canonical(&mut records);

        let keys: HashSet<&str> = records.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(keys.len(), records.len());
        assert_eq!(records[0].relative_path, "a.txt");
        assert_eq!(records[0].absolute_path, PathBuf::from("/r/a1"));
        assert!(!disambiguate_duplicates(&mut records));
    }

    #[cfg(unix)]
    #[test]
    fn undecodable_name_bytes_are_escaped() {
        use std::os::unix::ffi::OsStrExt;
        assert_eq!(path_segment(OsStr::from_bytes(b"caf\xe9.txt")), "caf\\xE9.txt");
        assert_eq!(path_segment(OsStr::from_bytes(b"caf\xe8.txt")), "caf\\xE8.txt");
        assert_eq!(path_segment(OsStr::new("café.txt")), "café.txt");
    }

    #[test]
    fn counts_partition_records() {
        let mk = |rel: &str, decision| FileRecord {
            absolute_path: PathBuf::from(rel),
            relative_path: rel.to_string(),
            size_bytes: 1,
            decision,
        };
        let records = vec![
            mk("a", Decision::Included),
            mk("b", Decision::ExcludedBinary),
            mk("c", Decision::ExcludedTooLarge),
            mk("d", Decision::ExcludedIgnored),
            mk("e", Decision::Included),
        ];
        let counts = Counts::from_records(&records);
        assert_eq!(counts.total, 5);
        assert_eq!(
            counts.included + counts.binary + counts.too_large + counts.ignored,
            counts.total
        );
        assert_eq!(counts.skipped(), 3);
    }
}
