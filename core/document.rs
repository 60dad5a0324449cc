//! Document assembly: one classified tree in, the human document model and
//! the flattened export out, both in canonical order.

use crate::classify::{ClassifiedTree, Classifier, Counts, Decision, FileRecord};
use crate::config::Config;
use crate::error::Result;
use crate::flatten::{FlatDocument, FlatEntry, read_text};
use crate::listing::tree_listing;
use crate::render::{BodyKind, RenderedBody, RendererSet};
use crate::size::bytes_human;
use crate::stats::RepoStats;
use crate::tree::{AnchorMap, NavKind, NavTree};
use chrono::Utc;
use log;
use rayon::prelude::*;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::path::PathBuf;

pub const UNKNOWN_REVISION: &str = "(unknown)";
pub const TOC_ID: &str = "toc";
pub const TREE_ID: &str = "tree";
pub const SKIPPED_BINARY_ID: &str = "skipped-binary";
pub const SKIPPED_LARGE_ID: &str = "skipped-large";
pub const SECTION_ID_PREFIX: &str = "file-";
pub const NO_TEXT_FILES_NOTICE: &str = "No text files to show.";

/// What to flatten: a local checkout plus display-only identity.
#[derive(Debug, Clone)]
pub struct RepoSource {
    /// URL or other identifier, shown verbatim.
    pub identifier: String,
    pub root: PathBuf,
    pub revision: Option<String>,
}

impl RepoSource {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            identifier: root.display().to_string(),
            root,
            revision: None,
        }
    }

    pub fn revision_or_unknown(&self) -> &str {
        self.revision.as_deref().unwrap_or(UNKNOWN_REVISION)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct StatRow {
    pub label: String,
    pub value: String,
}

impl StatRow {
    fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct ListItem {
    pub depth: usize,
    pub label: String,
    pub href: Option<String>,
    pub note: Option<String>,
}

/// Typed content nodes; [`crate::html::render_html`] decides the markup.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(tag = "type", rename_all = "camelCase"))]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        id: Option<String>,
    },
    Text {
        text: String,
    },
    Stats {
        title: String,
        rows: Vec<StatRow>,
    },
    List {
        id: String,
        title: String,
        items: Vec<ListItem>,
    },
    CodeBlock {
        id: Option<String>,
        text: String,
    },
    /// Pre-rendered, trusted HTML from a text renderer.
    Html {
        kind: BodyKind,
        html: String,
    },
    Error {
        message: String,
    },
    Section {
        id: String,
        title: String,
        note: Option<String>,
        body: Vec<Block>,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct DocumentMeta {
    pub repository: String,
    pub revision: String,
    pub generated_at: String,
    pub max_bytes: u64,
    pub counts: Counts,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct HumanDocument {
    pub meta: DocumentMeta,
    pub blocks: Vec<Block>,
}

impl HumanDocument {
    /// File sections in emission order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &str, &[Block])> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Section { id, title, body, .. } => {
                Some((id.as_str(), title.as_str(), body.as_slice()))
            }
            _ => None,
        })
    }

    pub fn list(&self, list_id: &str) -> Option<&[ListItem]> {
        self.blocks.iter().find_map(|block| match block {
            Block::List { id, items, .. } if id == list_id => Some(items.as_slice()),
            _ => None,
        })
    }
}

/// Everything one build produces, derived from a single record list.
#[derive(Debug, Clone)]
pub struct Documents {
    pub human: HumanDocument,
    pub flat: FlatDocument,
    pub nav: NavTree,
    pub anchors: AnchorMap,
    pub stats: RepoStats,
    pub counts: Counts,
}

pub struct DocumentBuilder<'a> {
    renderers: &'a RendererSet,
    include_stats: bool,
    use_tree_command: bool,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(renderers: &'a RendererSet) -> Self {
        Self {
            renderers,
            include_stats: true,
            use_tree_command: true,
        }
    }

    pub fn include_stats(mut self, include: bool) -> Self {
        self.include_stats = include;
        self
    }

    pub fn use_tree_command(mut self, enabled: bool) -> Self {
        self.use_tree_command = enabled;
        self
    }

    pub fn build(&self, source: &RepoSource, tree: &ClassifiedTree, max_bytes: u64) -> Documents {
        let counts = tree.counts();
        let included: Vec<&FileRecord> = tree.included().collect();
        let anchors = AnchorMap::assign(included.iter().copied());
        let nav = NavTree::build(&tree.records, &anchors);
        let stats = RepoStats::from_records(&tree.records);

        // Each file is read once; the text feeds both its section and its export entry.
        let rendered: Vec<(Block, FlatEntry)> = included
            .par_iter()
            .enumerate()
            .map(|(i, record)| self.render_file(i + 1, record, &anchors))
            .collect();
        let (sections, entries): (Vec<Block>, Vec<FlatEntry>) = rendered.into_iter().unzip();

        let meta = DocumentMeta {
            repository: source.identifier.clone(),
            revision: source.revision_or_unknown().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            max_bytes,
            counts,
        };

        let mut blocks = vec![Block::Heading {
            level: 1,
            text: source.identifier.clone(),
            id: Some("top".to_string()),
        }];
        blocks.push(summary_block(&meta));
        if self.include_stats {
            blocks.extend(stats_blocks(&stats));
        }
        blocks.push(Block::Heading {
            level: 2,
            text: "Directory tree".to_string(),
            id: None,
        });
        blocks.push(Block::CodeBlock {
            id: Some(TREE_ID.to_string()),
            text: tree_listing(&tree.root, self.use_tree_command),
        });
        blocks.push(Block::List {
            id: TOC_ID.to_string(),
            title: format!("Contents ({})", counts.included),
            items: nav_items(&nav),
        });
        blocks.extend(skip_list(
            tree,
            Decision::ExcludedBinary,
            SKIPPED_BINARY_ID,
            "Skipped binaries",
        ));
        blocks.extend(skip_list(
            tree,
            Decision::ExcludedTooLarge,
            SKIPPED_LARGE_ID,
            "Skipped large files",
        ));
        if sections.is_empty() {
            blocks.push(Block::Text {
                text: NO_TEXT_FILES_NOTICE.to_string(),
            });
        }
        blocks.extend(sections);

        log::info!(
            "Built document: {} sections, {} export entries.",
            counts.included,
            entries.len()
        );
        Documents {
            human: HumanDocument { meta, blocks },
            flat: FlatDocument { entries },
            nav,
            anchors,
            stats,
            counts,
        }
    }

    fn render_file(&self, index: usize, record: &FileRecord, anchors: &AnchorMap) -> (Block, FlatEntry) {
        let text = read_text(&record.absolute_path);
        let body = match &text {
            Ok(text) => match self.renderers.render(text, &record.relative_path) {
                Ok(RenderedBody { kind, html }) => Block::Html { kind, html },
                Err(e) => render_failure(record, &e),
            },
            Err(e) => render_failure(record, e),
        };
        let section = Block::Section {
            id: format!("{}{}", SECTION_ID_PREFIX, anchors.anchor_for(&record.relative_path)),
            title: record.relative_path.clone(),
            note: Some(bytes_human(record.size_bytes)),
            body: vec![body],
        };
        (section, FlatEntry::from_read(index, &record.relative_path, &text))
    }
}

fn render_failure(record: &FileRecord, error: &dyn std::fmt::Display) -> Block {
    log::warn!("Failed to render {}: {}", record.relative_path, error);
    Block::Error {
        message: format!("Failed to render: {}", error),
    }
}

fn summary_block(meta: &DocumentMeta) -> Block {
    let counts = &meta.counts;
    Block::Stats {
        title: "Summary".to_string(),
        rows: vec![
            StatRow::new("Repository", &meta.repository),
            StatRow::new("Revision", &meta.revision),
            StatRow::new("Total files", counts.total),
            StatRow::new("Rendered", counts.included),
            StatRow::new("Skipped", counts.skipped()),
            StatRow::new("Size limit", bytes_human(meta.max_bytes)),
            StatRow::new("Generated", &meta.generated_at),
        ],
    }
}

fn stats_blocks(stats: &RepoStats) -> Vec<Block> {
    vec![
        Block::Stats {
            title: "Size analysis".to_string(),
            rows: vec![
                StatRow::new("Total size", bytes_human(stats.total_size)),
                StatRow::new("Average file size", bytes_human(stats.average_size)),
                StatRow::new("Largest file", bytes_human(stats.largest_size)),
            ],
        },
        Block::Stats {
            title: "Directory structure".to_string(),
            rows: vec![
                StatRow::new("Max depth", format!("{} levels", stats.max_depth)),
                StatRow::new("Root files", stats.root_files),
                StatRow::new("Nested files", stats.nested_files),
            ],
        },
        Block::Stats {
            title: "Languages".to_string(),
            rows: stats
                .languages
                .iter()
                .map(|l| {
                    StatRow::new(
                        &l.name,
                        format!("{} files, {}", l.files, bytes_human(l.size_bytes)),
                    )
                })
                .collect(),
        },
        Block::Stats {
            title: "Top extensions".to_string(),
            rows: stats
                .extensions
                .iter()
                .map(|e| StatRow::new(&e.extension, e.files))
                .collect(),
        },
    ]
}

fn nav_items(nav: &NavTree) -> Vec<ListItem> {
    nav.entries()
        .into_iter()
        .map(|entry| match entry.kind {
            NavKind::Directory => ListItem {
                depth: entry.depth,
                label: format!("{}/", entry.name),
                href: None,
                note: None,
            },
            NavKind::File => ListItem {
                depth: entry.depth,
                label: entry.name,
                href: entry
                    .anchor
                    .map(|a| format!("#{}{}", SECTION_ID_PREFIX, a)),
                note: entry.size.map(bytes_human),
            },
        })
        .collect()
}

/// `None` when nothing was skipped for `decision`.
fn skip_list(tree: &ClassifiedTree, decision: Decision, id: &str, title: &str) -> Option<Block> {
    let items: Vec<ListItem> = tree
        .with_decision(decision)
        .map(|record| ListItem {
            depth: 0,
            label: record.relative_path.clone(),
            href: None,
            note: Some(bytes_human(record.size_bytes)),
        })
        .collect();
    if items.is_empty() {
        return None;
    }
    Some(Block::List {
        id: id.to_string(),
        title: format!("{} ({})", title, items.len()),
        items,
    })
}

/// Classify `source.root` with `config`, then build both documents. Fails
/// only when the root cannot be scanned or the configuration is invalid.
pub fn render_repository(source: &RepoSource, config: &Config) -> Result<Documents> {
    let classifier = Classifier::from_config(config)?;
    let tree = classifier.classify_tree(&source.root)?;
    let renderers = RendererSet::from_config(&config.render)?;
    let documents = DocumentBuilder::new(&renderers)
        .include_stats(config.render.include_stats)
        .use_tree_command(config.tree.use_tree_command)
        .build(source, &tree, classifier.max_bytes());
    Ok(documents)
}
