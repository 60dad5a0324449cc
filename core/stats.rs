use crate::classify::FileRecord;
use crate::output_formats::{dotted_extension, get_language_categories};
use indexmap::IndexMap;
#[cfg(feature = "serde_support")]
use serde::Serialize;

pub const TOP_LANGUAGES: usize = 8;
pub const TOP_EXTENSIONS: usize = 12;
pub const OTHER_LANGUAGE: &str = "Other";
pub const NO_EXTENSION: &str = "no-extension";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct LanguageStat {
    pub name: String,
    pub files: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct ExtensionStat {
    pub extension: String,
    pub files: usize,
}

/// Aggregates over the included files of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct RepoStats {
    pub files: usize,
    pub total_size: u64,
    pub average_size: u64,
    pub largest_size: u64,
    pub max_depth: usize,
    pub root_files: usize,
    pub nested_files: usize,
    pub languages: Vec<LanguageStat>,
    pub extensions: Vec<ExtensionStat>,
}

impl RepoStats {
    /// Excluded records are ignored. Ties in the language and extension
    /// rankings keep first-seen order, so canonical input gives stable output.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        let mut stats = RepoStats::default();
        let mut languages: IndexMap<&'static str, (usize, u64)> = IndexMap::new();
        let mut extensions: IndexMap<String, usize> = IndexMap::new();

        for record in records.into_iter().filter(|r| r.decision.is_included()) {
            stats.files += 1;
            stats.total_size += record.size_bytes;
            stats.largest_size = stats.largest_size.max(record.size_bytes);

            let depth = record.depth();
            stats.max_depth = stats.max_depth.max(depth);
            if depth == 0 {
                stats.root_files += 1;
            } else {
                stats.nested_files += 1;
            }

            let ext = dotted_extension(&record.relative_path);
            let language = ext.as_deref().map_or(OTHER_LANGUAGE, language_for_extension);
            let entry = languages.entry(language).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.size_bytes;
            *extensions
                .entry(ext.unwrap_or_else(|| NO_EXTENSION.to_string()))
                .or_insert(0) += 1;
        }

        if stats.files > 0 {
            stats.average_size = stats.total_size / stats.files as u64;
        }

        let mut languages: Vec<LanguageStat> = languages
            .into_iter()
            .map(|(name, (files, size_bytes))| LanguageStat {
                name: name.to_string(),
                files,
                size_bytes,
            })
            .collect();
        languages.sort_by(|a, b| b.files.cmp(&a.files));
        languages.truncate(TOP_LANGUAGES);
        stats.languages = languages;

        let mut extensions: Vec<ExtensionStat> = extensions
            .into_iter()
            .map(|(extension, files)| ExtensionStat { extension, files })
            .collect();
        extensions.sort_by(|a, b| b.files.cmp(&a.files));
        extensions.truncate(TOP_EXTENSIONS);
        stats.extensions = extensions;

        stats
    }
}

/// Category name for a lowercased dotted extension, `"Other"` when unmapped.
pub fn language_for_extension(ext: &str) -> &'static str {
    get_language_categories()
        .iter()
        .find(|category| category.extensions.iter().any(|e| e == ext))
        .map_or(OTHER_LANGUAGE, |category| category.name.as_str())
}
