pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod flatten;
pub mod html;
pub mod listing;
pub mod output_formats;
pub mod render;
pub mod size;
pub mod stats;
pub mod tree;

pub use classify::{ClassifiedTree, Classifier, Counts, Decision, FileRecord};
pub use config::{Config, FlatFormat};
pub use document::{
    Block, DocumentBuilder, Documents, HumanDocument, RepoSource, render_repository,
};
pub use error::{AppError, Result};
pub use flatten::{FlatDocument, FlatEntry};
pub use html::render_html;
pub use listing::{generate_tree_fallback, tree_listing};
pub use render::{RendererSet, TextRenderer};
pub use size::bytes_human;
pub use stats::RepoStats;
pub use tree::{AnchorMap, NavNode, NavTree, slugify};
