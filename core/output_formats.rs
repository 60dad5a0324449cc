use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Default, Deserialize)]
pub struct ClassifyTables {
    #[serde(default)]
    pub vcs_dirs: HashSet<String>,
    #[serde(default)]
    pub binary_extensions: HashSet<String>,
    #[serde(default)]
    pub markdown_extensions: HashSet<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageCategory {
    pub name: String,
    pub extensions: Vec<String>,
}

static CLASSIFY_TABLES: Lazy<ClassifyTables> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/classify.yaml"));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/classify.yaml")
});
static LANGUAGE_CATEGORIES: Lazy<Vec<LanguageCategory>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/languages.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/languages.yaml")
});

pub fn get_classify_tables() -> &'static ClassifyTables {
    &CLASSIFY_TABLES
}
pub fn get_language_categories() -> &'static [LanguageCategory] {
    &LANGUAGE_CATEGORIES
}

/// Lowercased extension with its leading dot (`".rs"`). Dotfiles such as
/// `.gitignore` and names ending in a dot have no extension.
pub fn dotted_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx..].to_lowercase()),
        _ => None,
    }
}

pub fn is_markdown_path(path: &str) -> bool {
    dotted_extension(path)
        .is_some_and(|ext| get_classify_tables().markdown_extensions.contains(&ext))
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, AppError> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(value).map_err(AppError::JsonSerialize)
    }
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_yaml<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_yml::to_string(value).map_err(AppError::YamlError)
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_xml<T: Serialize>(value: &T, root_name: &str) -> Result<String, AppError> {
    Ok(quick_xml::se::to_string_with_root(root_name, value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tables_load() {
        let tables = get_classify_tables();
        assert!(tables.vcs_dirs.contains(".git"));
        assert!(tables.binary_extensions.contains(".png"));
        assert!(tables.markdown_extensions.contains(".md"));
        assert!(!get_language_categories().is_empty());
    }

    #[test]
    fn dotted_extension_lowercases_last_suffix() {
        assert_eq!(dotted_extension("src/Logo.PNG").as_deref(), Some(".png"));
        assert_eq!(dotted_extension("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(dotted_extension(".gitignore"), None);
        assert_eq!(dotted_extension(".eslintrc.json").as_deref(), Some(".json"));
        assert_eq!(dotted_extension("Makefile"), None);
        assert_eq!(dotted_extension("weird."), None);
        assert_eq!(dotted_extension("dir.d/Makefile"), None);
    }
}
