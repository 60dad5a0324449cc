use crate::classify::FileRecord;
use indexmap::IndexMap;
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashSet;

/// Keeps ASCII/Unicode alphanumerics, `-` and `_`; everything else becomes `-`.
///
/// Distinct paths can collide (`a/b.py` and `a-b.py`); [`AnchorMap`] resolves that.
pub fn slugify(path: &str) -> String {
    path.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

/// Anchor per relative path, assigned in canonical order.
///
/// The first path to produce a slug keeps it; later collisions get `-2`, `-3`, ...
#[derive(Debug, Clone, Default)]
pub struct AnchorMap {
    anchors: IndexMap<String, String>,
}

impl AnchorMap {
    pub fn assign<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        let mut anchors = IndexMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        for record in records {
            let base = slugify(&record.relative_path);
            let mut anchor = base.clone();
            let mut suffix = 2;
            while taken.contains(&anchor) {
                anchor = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            if anchor != base {
                log::debug!(
                    "Anchor collision for '{}', using '{}'",
                    record.relative_path,
                    anchor
                );
            }
            taken.insert(anchor.clone());
            anchors.insert(record.relative_path.clone(), anchor);
        }
        Self { anchors }
    }

    pub fn get(&self, relative_path: &str) -> Option<&str> {
        self.anchors.get(relative_path).map(String::as_str)
    }

    /// Anchor for `relative_path`, falling back to its plain slug.
    pub fn anchor_for(&self, relative_path: &str) -> String {
        self.get(relative_path)
            .map(str::to_string)
            .unwrap_or_else(|| slugify(relative_path))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.anchors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(tag = "type", rename_all = "camelCase"))]
pub enum NavNode {
    Directory {
        name: String,
        children: Vec<NavNode>,
    },
    File {
        name: String,
        path: String,
        size: u64,
        anchor: String,
    },
}

impl NavNode {
    pub fn name(&self) -> &str {
        match self {
            NavNode::Directory { name, .. } | NavNode::File { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NavNode::Directory { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "lowercase"))]
pub enum NavKind {
    Directory,
    File,
}

/// One row of the flattened navigation index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct NavEntry {
    pub depth: usize,
    pub kind: NavKind,
    pub name: String,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub path: Option<String>,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub anchor: Option<String>,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub size: Option<u64>,
}

/// Included files grouped by directory. Directories only exist when they
/// hold at least one included file.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct NavTree {
    pub roots: Vec<NavNode>,
}

impl NavTree {
    pub fn build<'a, I>(records: I, anchors: &AnchorMap) -> Self
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        let mut roots: Vec<NavNode> = Vec::new();
        let mut inserted = 0usize;
        for record in records {
            if !record.decision.is_included() {
                continue;
            }
            let segments: Vec<&str> = record
                .relative_path
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            let Some((file_name, dirs)) = segments.split_last() else {
                continue;
            };
            let leaf = NavNode::File {
                name: (*file_name).to_string(),
                path: record.relative_path.clone(),
                size: record.size_bytes,
                anchor: anchors.anchor_for(&record.relative_path),
            };
            insert_node(&mut roots, dirs, leaf);
            inserted += 1;
        }
        sort_level(&mut roots);
        log::debug!("Navigation tree built from {} included files.", inserted);
        Self { roots }
    }

    /// Depth-first rows: each directory at depth `d`, its contents below it at `d + 1`.
    pub fn entries(&self) -> Vec<NavEntry> {
        let mut out = Vec::new();
        flatten_level(&self.roots, 0, &mut out);
        out
    }

    /// Relative paths of every file leaf in display order.
    pub fn file_paths(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.path)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn insert_node(level: &mut Vec<NavNode>, dirs: &[&str], leaf: NavNode) {
    let Some((dir_name, rest)) = dirs.split_first() else {
        level.push(leaf);
        return;
    };
    let existing = level
        .iter()
        .position(|node| node.is_dir() && node.name() == *dir_name);
    let index = match existing {
        Some(index) => index,
        None => {
            level.push(NavNode::Directory {
                name: (*dir_name).to_string(),
                children: Vec::new(),
            });
            level.len() - 1
        }
    };
    if let NavNode::Directory { children, .. } = &mut level[index] {
        insert_node(children, rest, leaf);
    }
}

/// Directories before files; each group by lowercase name, then by exact name.
fn sort_level(level: &mut [NavNode]) {
    level.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
            .then_with(|| a.name().cmp(b.name()))
    });
    for node in level.iter_mut() {
        if let NavNode::Directory { children, .. } = node {
            sort_level(children);
        }
    }
}

fn flatten_level(level: &[NavNode], depth: usize, out: &mut Vec<NavEntry>) {
    for node in level {
        match node {
            NavNode::Directory { name, children } => {
                out.push(NavEntry {
                    depth,
                    kind: NavKind::Directory,
                    name: name.clone(),
                    path: None,
                    anchor: None,
                    size: None,
                });
                flatten_level(children, depth + 1, out);
            }
            NavNode::File {
                name,
                path,
                size,
                anchor,
            } => out.push(NavEntry {
                depth,
                kind: NavKind::File,
                name: name.clone(),
                path: Some(path.clone()),
                anchor: Some(anchor.clone()),
                size: Some(*size),
            }),
        }
    }
}
