use rendergit_core::config::Config;
use rendergit_core::document::{SECTION_ID_PREFIX, TOC_ID};
use rendergit_core::{
    Block, Classifier, DocumentBuilder, FlatDocument, RendererSet, RepoSource, render_html,
    render_repository,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

fn offline_config() -> Config {
    let mut config = Config::default();
    config.tree.use_tree_command = false;
    config
}

#[test]
fn reference_scenario() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "README.md", &[b'a'; 500]);
    write(root, "logo.png", &[b'p'; 2000]);
    write(root, "vendor/lib.bin", &vec![b'b'; 80000]);
    write(root, ".git/HEAD", b"ref: refs/heads/main\n");

    let docs = render_repository(&RepoSource::local(root), &offline_config()).unwrap();
    assert_eq!(docs.counts.total, 4);
    assert_eq!(docs.counts.included, 1);
    assert_eq!(docs.counts.binary, 1);
    assert_eq!(docs.counts.too_large, 1);
    assert_eq!(docs.counts.ignored, 1);

    assert_eq!(docs.flat.len(), 1);
    assert_eq!(docs.flat.entries[0].index, 1);
    assert_eq!(docs.flat.entries[0].source, "README.md");

    assert_eq!(docs.human.meta.counts, docs.counts);
    assert_eq!(docs.human.meta.revision, "(unknown)");
}

#[test]
fn toc_sections_and_export_refer_to_the_same_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "b.txt", b"b\n");
    write(root, "A/z.md", b"# z\n");
    write(root, "a-b.py", b"x = 1\n");
    write(root, "a/b.py", b"y = 2\n");
    write(root, "img.gif", b"GIF89a");

    let docs = render_repository(&RepoSource::local(root), &offline_config()).unwrap();

    let section_ids: Vec<(String, String)> = docs
        .human
        .sections()
        .map(|(id, title, _)| (id.to_string(), title.to_string()))
        .collect();
    let export: Vec<&str> = docs.flat.entries.iter().map(|e| e.source.as_str()).collect();
    let titles: Vec<&str> = section_ids.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(titles, vec!["A/z.md", "a-b.py", "a/b.py", "b.txt"]);
    assert_eq!(export, titles);
    for (i, entry) in docs.flat.entries.iter().enumerate() {
        assert_eq!(entry.index, i + 1);
    }

    // Every navigation link resolves to the section for the same path.
    let toc = docs.human.list(TOC_ID).unwrap();
    let nav_paths = docs.nav.file_paths();
    let hrefs: Vec<&str> = toc.iter().filter_map(|item| item.href.as_deref()).collect();
    assert_eq!(hrefs.len(), nav_paths.len());
    for (href, path) in hrefs.iter().zip(&nav_paths) {
        let (id, title) = section_ids
            .iter()
            .find(|(id, _)| format!("#{}", id) == *href)
            .unwrap();
        assert_eq!(title, path);
        assert_eq!(id, &format!("{}{}", SECTION_ID_PREFIX, docs.anchors.get(path).unwrap()));
    }

    // Colliding slugs are disambiguated in canonical order.
    assert_eq!(docs.anchors.get("a-b.py"), Some("a-b-py"));
    assert_eq!(docs.anchors.get("a/b.py"), Some("a-b-py-2"));
}

#[test]
fn file_removed_after_classification_is_still_exported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "keep.txt", b"kept\n");
    write(root, "gone.txt", b"soon gone\n");

    let classifier = Classifier::new(1024);
    let tree = classifier.classify_tree(root).unwrap();
    fs::remove_file(root.join("gone.txt")).unwrap();

    let renderers = RendererSet::plain_only();
    let docs = DocumentBuilder::new(&renderers)
        .use_tree_command(false)
        .build(&RepoSource::local(root), &tree, classifier.max_bytes());

    assert_eq!(docs.flat.len(), 2);
    let gone = &docs.flat.entries[0];
    assert_eq!(gone.source, "gone.txt");
    assert!(gone.read_error);
    assert!(gone.content.starts_with("Failed to read: "));
    assert_eq!(docs.flat.entries[1].content, "kept\n");

    let (_, title, body) = docs.human.sections().next().unwrap();
    assert_eq!(title, "gone.txt");
    assert!(matches!(&body[0], Block::Error { .. }));
    let (_, _, body) = docs.human.sections().nth(1).unwrap();
    assert!(matches!(&body[0], Block::Html { .. }));
}

#[test]
fn cxml_export_parses_back_to_the_same_pairs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "empty.txt", b"");
    write(root, "nested/deep/code.rs", b"fn main() {\n    println!(\"<hi>\");\n}\n");
    write(root, "notes.md", b"</document_content>\n</document>\n");

    let docs = render_repository(&RepoSource::local(root), &offline_config()).unwrap();
    let text = docs.flat.to_cxml();
    let parsed = FlatDocument::parse_cxml(&text).unwrap();
    let exported: Vec<(&str, &str)> = docs.flat.pairs().collect();
    let recovered: Vec<(&str, &str)> = parsed.pairs().collect();
    assert_eq!(exported, recovered);
    assert_eq!(recovered[0], ("empty.txt", ""));
}

#[test]
fn page_contains_every_section_and_skip_list() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "README.md", b"# Hello\n\nSome *text*.\n");
    write(root, "src/lib.rs", b"pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
    write(root, "photo.jpg", b"jpeg");

    let mut config = offline_config();
    config.general.max_bytes = 1024;
    let docs = render_repository(&RepoSource::local(root), &config).unwrap();
    let page = render_html(&docs.human, Some(&docs.flat.to_cxml())).unwrap();

    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("id=\"file-README-md\""));
    assert!(page.contains("id=\"file-src-lib-rs\""));
    assert!(page.contains("<h1>Hello</h1>"));
    assert!(page.contains("Skipped binaries (1)"));
    assert!(page.contains("photo.jpg"));
    assert!(!page.contains("Skipped large files"));
    assert!(page.contains("id=\"llm-view\""));
}

#[test]
fn render_repository_fails_only_for_missing_root() {
    let dir = TempDir::new().unwrap();
    let missing = RepoSource::local(dir.path().join("missing"));
    assert!(render_repository(&missing, &offline_config()).is_err());

    let empty = RepoSource::local(dir.path());
    let docs = render_repository(&empty, &offline_config()).unwrap();
    assert_eq!(docs.counts.total, 0);
    assert!(docs.flat.is_empty());
    assert_eq!(docs.flat.to_cxml(), "<documents>\n</documents>");
    let page = render_html(&docs.human, None).unwrap();
    assert!(page.contains("No text files to show."));
}
